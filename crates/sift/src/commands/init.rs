use super::config_file;
use crate::config::SiftConfig;
use sift_store::Paths;
use std::path::Path;

pub fn run(config: Option<&Path>) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let path = config_file(&paths, config);

    if write_starter(&path)? {
        println!("✓ Wrote default config to {}", path.display());
        println!("\nEnabled:");
        println!("  - deduplication");
        println!("  - supersedeWrites");
        println!("  - errorPurge (turnsToKeep: 4)");
    } else {
        println!("✓ Config already exists at {}", path.display());
    }
    Ok(())
}

/// Write the starter config unless a file is already there
fn write_starter(path: &Path) -> anyhow::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    sift_store::write_json(path, &SiftConfig::starter())?;
    Ok(true)
}
