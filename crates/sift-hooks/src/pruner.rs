//! Context pruning hook
//!
//! On every messages-transform event: load the conversation's overrides, run
//! the engine, persist the stable index map and render the history map that
//! the next system-transform event injects.

use crate::base::Hook;
use sift_core::{history, Message, PruningConfig, PruningEngine};
use sift_store::{OverrideStore, PruneRecord};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct PrunerHook {
    enabled: bool,
    engine: PruningEngine,
    store: Arc<OverrideStore>,
}

impl PrunerHook {
    pub fn new(config: &PruningConfig, store: Arc<OverrideStore>) -> Self {
        Self {
            enabled: config.enabled,
            engine: PruningEngine::new(config),
            store,
        }
    }

    /// One pruning pass; the log comes back unchanged on any failure
    pub fn transform(&self, session_id: &str, messages: Vec<Message>) -> Vec<Message> {
        let overrides = self.store.load(session_id);
        let compaction = match self.engine.try_compact(&messages, &overrides) {
            Ok(compaction) => compaction,
            Err(e) => {
                warn!(session = session_id, error = %e, "pruning failed, passing log through unchanged");
                return messages;
            }
        };

        if let Err(e) = self
            .store
            .save_index_map(session_id, &compaction.index.stable_index_map())
        {
            warn!(session = session_id, error = %e, "failed to save index map");
        }

        let map = history::render(&compaction.index, &overrides);
        if let Err(e) = self.store.save_history_map(session_id, &map) {
            warn!(session = session_id, error = %e, "failed to save history map");
        }

        let stats = compaction.stats();
        debug!(
            session = session_id,
            tool_calls = stats.tool_calls,
            outputs = stats.outputs_pruned,
            inputs = stats.inputs_pruned,
            "pruning pass completed"
        );
        if stats.tool_calls > 0 {
            self.store
                .record_pass(&PruneRecord::from_stats(session_id, &stats));
        }

        compaction.messages
    }
}

impl Hook for PrunerHook {
    fn name(&self) -> &str {
        "pruner"
    }

    fn description(&self) -> &str {
        "Replaces redundant tool payloads with placeholders and publishes the history map"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn on_messages(&mut self, session_id: &str, messages: Vec<Message>) -> Vec<Message> {
        self.transform(session_id, messages)
    }

    fn on_system(&mut self, session_id: &str) -> Option<String> {
        self.store.history_map(session_id)
    }

    fn on_session_deleted(&mut self, session_id: &str) {
        if let Err(e) = self.store.purge(session_id) {
            warn!(session = session_id, error = %e, "failed to remove conversation state");
        }
    }
}
