use super::{config_file, Runtime};
use sift_core::Disposition;
use sift_store::OverrideStore;
use std::path::Path;

pub fn run(config: Option<&Path>, session: Option<&str>) -> anyhow::Result<()> {
    let runtime = Runtime::load(config)?;

    let mut output = serde_json::json!({
        "config": config_file(&runtime.paths, config).display().to_string(),
        "pruning": runtime.config.dcp.enabled,
        "state": runtime.paths.root.display().to_string(),
        "conversations": count_conversations(&runtime.paths.sessions_dir()),
    });

    if let Some(id) = session {
        output["session"] = session_summary(&runtime.store, id);
    }

    println!("{output}");
    Ok(())
}

fn count_conversations(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| e.path().is_dir())
                .count()
        })
        .unwrap_or(0)
}

fn session_summary(store: &OverrideStore, id: &str) -> serde_json::Value {
    let overrides = store.load(id);
    let discarded = overrides
        .values()
        .filter(|raw| matches!(Disposition::parse(raw), Disposition::Discarded(_)))
        .count();

    serde_json::json!({
        "id": id,
        "indexed": store.load_index_map(id).len(),
        "extracted": overrides.len() - discarded,
        "discarded": discarded,
        "history_map": store.history_map(id).is_some(),
    })
}
