//! Configuration for context pruning

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Read-only lookup tools whose repeated identical calls are deduplicated
pub const DEDUP_TOOLS: &[&str] = &[
    "ls",
    "glob",
    "grep",
    "read",
    "lsp_find_references",
    "lsp_symbols",
    "ast_search",
];

/// Tools whose input carries file content
pub const WRITE_TOOLS: &[&str] = &["write", "edit"];

/// Tools that re-read a file and make earlier write payloads redundant
pub const READ_TOOLS: &[&str] = &["read", "cat"];

/// Input fields that hold large file content
pub const CONTENT_FIELDS: &[&str] = &["content", "newString"];

/// Input fields naming the file a tool touches, in lookup order
pub const PATH_FIELDS: &[&str] = &["filePath", "path"];

fn default_true() -> bool {
    true
}

fn default_turns_to_keep() -> usize {
    4
}

fn default_protected_tools() -> Vec<String> {
    vec![
        "task".to_string(),
        "todowrite".to_string(),
        "todoread".to_string(),
    ]
}

/// Stale-error purge settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPurge {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Errors at least this many turns old are pruned
    #[serde(default = "default_turns_to_keep")]
    pub turns_to_keep: usize,
}

impl Default for ErrorPurge {
    fn default() -> Self {
        Self {
            enabled: true,
            turns_to_keep: default_turns_to_keep(),
        }
    }
}

/// Individually toggleable automatic strategies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategies {
    #[serde(default = "default_true")]
    pub deduplication: bool,
    #[serde(default = "default_true")]
    pub supersede_writes: bool,
    #[serde(default)]
    pub error_purge: ErrorPurge,
}

impl Default for Strategies {
    fn default() -> Self {
        Self {
            deduplication: true,
            supersede_writes: true,
            error_purge: ErrorPurge::default(),
        }
    }
}

/// `dcp` section of the plugin config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PruningConfig {
    /// Pruning is off unless explicitly enabled
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub strategies: Strategies,
    /// Tool names exempt from every automatic strategy
    #[serde(default = "default_protected_tools")]
    pub protected_tools: Vec<String>,
}

impl PruningConfig {
    pub fn new() -> Self {
        Self {
            enabled: true,
            strategies: Strategies::default(),
            protected_tools: default_protected_tools(),
        }
    }

    pub fn protected_set(&self) -> HashSet<String> {
        self.protected_tools.iter().cloned().collect()
    }
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = PruningConfig::new();
        assert!(config.enabled);
        assert!(config.strategies.deduplication);
        assert!(config.strategies.supersede_writes);
        assert!(config.strategies.error_purge.enabled);
        assert_eq!(config.strategies.error_purge.turns_to_keep, 4);
        assert!(config.protected_set().contains("todowrite"));
        assert!(!PruningConfig::default().enabled);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: PruningConfig = serde_json::from_str(
            r#"{"enabled": true, "strategies": {"supersedeWrites": false, "errorPurge": {"turnsToKeep": 2}}}"#,
        )
        .unwrap();
        assert!(config.enabled);
        assert!(config.strategies.deduplication);
        assert!(!config.strategies.supersede_writes);
        assert!(config.strategies.error_purge.enabled);
        assert_eq!(config.strategies.error_purge.turns_to_keep, 2);
        assert_eq!(config.protected_tools, vec!["task", "todowrite", "todoread"]);
    }

    #[test]
    fn test_missing_enabled_means_disabled() {
        let config: PruningConfig = serde_json::from_str("{}").unwrap();
        assert!(!config.enabled);
    }
}
