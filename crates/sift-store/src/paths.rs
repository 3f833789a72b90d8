//! Path resolution for persisted state and configuration

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Environment variable overriding the state root
pub const HOME_ENV: &str = "SIFT_HOME";

/// Resolves where sift keeps its files
#[derive(Debug, Clone)]
pub struct Paths {
    pub root: PathBuf,
    pub config_dir: PathBuf,
}

impl Paths {
    /// Resolve from `SIFT_HOME` or the platform data directory
    pub fn new() -> std::io::Result<Self> {
        let root = match std::env::var_os(HOME_ENV) {
            Some(home) if !home.is_empty() => PathBuf::from(home),
            _ => dirs::data_dir()
                .ok_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::NotFound, "data directory not found")
                })?
                .join("sift"),
        };

        let config_dir = dirs::config_dir()
            .ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "config directory not found")
            })?
            .join("opencode");

        Ok(Self { root, config_dir })
    }

    /// Rooted at an explicit directory; config lives under `<root>/config`
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            config_dir: root.join("config"),
            root,
        }
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    /// Directory for one conversation
    pub fn session_dir(&self, conversation_id: &str) -> PathBuf {
        self.sessions_dir().join(sanitize_id(conversation_id))
    }

    pub fn overrides_file(&self, conversation_id: &str) -> PathBuf {
        self.session_dir(conversation_id).join("overrides.json")
    }

    pub fn index_map_file(&self, conversation_id: &str) -> PathBuf {
        self.session_dir(conversation_id).join("index_map.json")
    }

    pub fn history_map_file(&self, conversation_id: &str) -> PathBuf {
        self.session_dir(conversation_id).join("history_map.txt")
    }

    pub fn telemetry_dir(&self) -> PathBuf {
        self.root.join("telemetry")
    }

    /// Get prune.jsonl path
    pub fn prune_log(&self) -> PathBuf {
        self.telemetry_dir().join("prune.jsonl")
    }

    /// Get sift.json path
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("sift.json")
    }
}

/// Map a conversation id onto a single safe path component.
///
/// Ids made only of ASCII alphanumerics, `-` and `_` are used verbatim.
/// Anything else is cleaned and suffixed with `.` plus a digest of the raw
/// id; verbatim ids never contain `.`, so distinct ids never share a directory.
pub fn sanitize_id(id: &str) -> String {
    let is_safe = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    if !id.is_empty() && id.chars().all(is_safe) {
        return id.to_string();
    }

    let cleaned: String = id
        .chars()
        .map(|c| if is_safe(c) { c } else { '_' })
        .collect();
    let digest = Sha256::digest(id.as_bytes());
    format!("{}.{}", cleaned, hex::encode(&digest[..8]))
}
