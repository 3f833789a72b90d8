pub mod hooks;
pub mod init;
pub mod report;
pub mod serve;
pub mod status;
pub mod tools;
pub mod version;

use crate::config::SiftConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sift_hooks::{HookRegistry, PrunerHook, PtyReaperHook};
use sift_pty::PtyManager;
use sift_store::{OverrideStore, Paths};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Resolved paths, config and store shared by every command
pub struct Runtime {
    pub paths: Paths,
    pub config: SiftConfig,
    pub store: Arc<OverrideStore>,
}

impl Runtime {
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let paths = Paths::new()?;
        let config = SiftConfig::load(&config_file(&paths, config_path));
        Ok(Self::new(paths, config))
    }

    pub fn new(paths: Paths, config: SiftConfig) -> Self {
        Self {
            store: Arc::new(OverrideStore::new(paths.clone())),
            paths,
            config,
        }
    }

    /// Hooks for host events; the reaper only when this process owns PTYs
    pub fn registry(&self, pty: Option<Arc<PtyManager>>) -> HookRegistry {
        let mut registry = HookRegistry::new();
        registry.register(Box::new(PrunerHook::new(
            &self.config.dcp,
            Arc::clone(&self.store),
        )));
        if let Some(manager) = pty {
            registry.register(Box::new(PtyReaperHook::new(manager)));
        }
        registry
    }
}

pub fn config_file(paths: &Paths, explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| paths.config_file())
}

fn read_stdin<T: DeserializeOwned>() -> anyhow::Result<T> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    Ok(serde_json::from_str(&input)?)
}

fn write_stdout<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string(value)?;
    let mut stdout = io::stdout();
    stdout.write_all(json.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
