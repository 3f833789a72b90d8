//! Plugin configuration (`sift.json`)

use serde::{Deserialize, Serialize};
use sift_agents::WaitOptions;
use sift_core::PruningConfig;
use sift_pty::DEFAULT_BUFFER_LINES;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_HOST_URL: &str = "http://127.0.0.1:4096";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiftConfig {
    /// Context pruning; absent means disabled
    #[serde(default)]
    pub dcp: PruningConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub pty: PtyConfig,
    #[serde(default)]
    pub host: HostConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentsConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// `null` waits until every agent is idle
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: Option<u64>,
}

fn default_poll_interval_ms() -> u64 {
    1500
}

fn default_timeout_secs() -> Option<u64> {
    Some(1800)
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AgentsConfig {
    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PtyConfig {
    #[serde(default = "default_buffer_lines")]
    pub buffer_lines: usize,
}

fn default_buffer_lines() -> usize {
    DEFAULT_BUFFER_LINES
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            buffer_lines: DEFAULT_BUFFER_LINES,
        }
    }
}

/// Where the host's session API listens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default = "default_host_url")]
    pub url: String,
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_host_url() -> String {
    DEFAULT_HOST_URL.to_string()
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            url: default_host_url(),
            directory: None,
        }
    }
}

impl SiftConfig {
    /// Load from disk; a missing or malformed file yields defaults
    pub fn load(path: &Path) -> Self {
        match sift_store::read_json::<SiftConfig>(path) {
            Ok(Some(config)) => config,
            Ok(None) => {
                debug!(path = %path.display(), "no config file, using defaults");
                Self::default()
            }
            Err(e) => {
                warn!(error = %e, "invalid config, using defaults");
                Self::default()
            }
        }
    }

    /// Config written by `sift init`: pruning switched on, everything else default
    pub fn starter() -> Self {
        Self {
            dcp: PruningConfig::new(),
            ..Self::default()
        }
    }
}
