//! Telemetry record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sift_core::PruneStats;
use std::collections::BTreeMap;

/// One completed pruning pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PruneRecord {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub tool_calls: usize,
    pub outputs_pruned: usize,
    pub inputs_pruned: usize,
    #[serde(default)]
    pub by_reason: BTreeMap<String, usize>,
}

impl PruneRecord {
    pub fn from_stats(session_id: &str, stats: &PruneStats) -> Self {
        Self {
            session_id: session_id.to_string(),
            timestamp: Utc::now(),
            tool_calls: stats.tool_calls,
            outputs_pruned: stats.outputs_pruned,
            inputs_pruned: stats.inputs_pruned,
            by_reason: stats.by_reason.clone(),
        }
    }

    pub fn total_pruned(&self) -> usize {
        self.outputs_pruned + self.inputs_pruned
    }
}
