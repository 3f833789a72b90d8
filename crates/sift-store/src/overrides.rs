//! Manual override store and stable index map
//!
//! Overrides are written only by the `extract` and `discard` tools. Reads fail
//! open: a missing or unreadable file means "no overrides yet".

use crate::error::StoreError;
use crate::io::{append_jsonl, atomic_write, read_json, write_json};
use crate::paths::Paths;
use crate::session::SessionRegistry;
use crate::types::PruneRecord;
use sift_core::{Disposition, IndexMap, OverrideMap};
use tracing::{debug, warn};

/// Cached state for one conversation
#[derive(Debug, Default)]
pub struct ConversationState {
    overrides: Option<OverrideMap>,
    index_map: Option<IndexMap>,
    history_map: Option<String>,
}

/// Per-index outcome of an extract/discard batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub disposition: Disposition,
    /// (index, tool-call id) pairs that were persisted
    pub applied: Vec<(usize, String)>,
    /// Indices absent from the stable index map
    pub missing: Vec<usize>,
    /// Batch items that are not positive integers, as the caller wrote them
    pub invalid: Vec<String>,
    /// Indices that resolved but could not be persisted
    pub failed: Vec<(usize, String)>,
}

impl BatchReport {
    fn new(disposition: &Disposition) -> Self {
        Self {
            disposition: disposition.clone(),
            applied: Vec::new(),
            missing: Vec::new(),
            invalid: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.invalid.is_empty() && self.failed.is_empty()
    }

    /// Text returned to the agent, one line per index
    pub fn render(&self) -> String {
        let verb = match self.disposition {
            Disposition::Extracted(_) => "extracted",
            Disposition::Discarded(_) => "discarded",
        };

        let mut lines = Vec::new();
        for (index, _) in &self.applied {
            lines.push(format!("Successfully {} ID {}.", verb, index));
        }
        let unknown = self.missing.iter().map(ToString::to_string);
        for index in unknown.chain(self.invalid.iter().cloned()) {
            lines.push(format!(
                "Error: ID {} not found in history map. Check the <history_map> block above.",
                index
            ));
        }
        for (index, error) in &self.failed {
            lines.push(format!("Error: could not save ID {}: {}", index, error));
        }
        if !self.applied.is_empty() {
            lines.push("The content will be replaced in the next turn.".to_string());
        }
        lines.join("\n")
    }
}

/// File-backed override and index store with a per-conversation cache
#[derive(Debug)]
pub struct OverrideStore {
    paths: Paths,
    state: SessionRegistry<ConversationState>,
}

impl OverrideStore {
    pub fn new(paths: Paths) -> Self {
        Self {
            paths,
            state: SessionRegistry::new(),
        }
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// Current overrides; disk is read once per conversation per process
    pub fn load(&self, conversation_id: &str) -> OverrideMap {
        self.state.get_or_create(conversation_id, |state| {
            self.cached_overrides(conversation_id, state).clone()
        })
    }

    fn cached_overrides<'a>(
        &self,
        conversation_id: &str,
        state: &'a mut ConversationState,
    ) -> &'a mut OverrideMap {
        state
            .overrides
            .get_or_insert_with(|| self.read_or_default(&self.paths.overrides_file(conversation_id)))
    }

    fn read_or_default<T: for<'de> serde::Deserialize<'de> + Default>(
        &self,
        path: &std::path::Path,
    ) -> T {
        match read_json(path) {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable state, starting empty");
                T::default()
            }
        }
    }

    /// Persist one disposition, merging into the existing map
    pub fn record(
        &self,
        conversation_id: &str,
        tool_call_id: &str,
        disposition: &Disposition,
    ) -> Result<(), StoreError> {
        self.record_many(conversation_id, &[tool_call_id.to_string()], disposition)
    }

    fn record_many(
        &self,
        conversation_id: &str,
        tool_call_ids: &[String],
        disposition: &Disposition,
    ) -> Result<(), StoreError> {
        self.state.get_or_create(conversation_id, |state| {
            let current = self.cached_overrides(conversation_id, state);
            let mut next = current.clone();
            for id in tool_call_ids {
                next.insert(id.clone(), disposition.encode());
            }
            write_json(&self.paths.overrides_file(conversation_id), &next)?;
            *current = next;
            debug!(
                session = conversation_id,
                count = tool_call_ids.len(),
                "overrides recorded"
            );
            Ok(())
        })
    }

    /// Resolve each index independently and persist all hits in one write
    pub fn apply_batch(
        &self,
        conversation_id: &str,
        indices: &[usize],
        disposition: &Disposition,
    ) -> BatchReport {
        let index_map = self.load_index_map(conversation_id);
        let mut report = BatchReport::new(disposition);
        let mut resolved = Vec::new();

        for &index in indices {
            if resolved.iter().any(|(seen, _)| *seen == index) {
                continue;
            }
            match index_map.get(&index) {
                Some(id) => resolved.push((index, id.clone())),
                None => report.missing.push(index),
            }
        }

        if resolved.is_empty() {
            return report;
        }

        let ids: Vec<String> = resolved.iter().map(|(_, id)| id.clone()).collect();
        match self.record_many(conversation_id, &ids, disposition) {
            Ok(()) => report.applied = resolved,
            Err(e) => {
                warn!(session = conversation_id, error = %e, "failed to persist overrides");
                let message = e.to_string();
                report.failed = resolved
                    .into_iter()
                    .map(|(index, _)| (index, message.clone()))
                    .collect();
            }
        }
        report
    }

    pub fn save_index_map(
        &self,
        conversation_id: &str,
        index_map: &IndexMap,
    ) -> Result<(), StoreError> {
        self.state.get_or_create(conversation_id, |state| {
            if state.index_map.as_ref() == Some(index_map) {
                return Ok(());
            }
            write_json(&self.paths.index_map_file(conversation_id), index_map)?;
            state.index_map = Some(index_map.clone());
            Ok(())
        })
    }

    pub fn load_index_map(&self, conversation_id: &str) -> IndexMap {
        self.state.get_or_create(conversation_id, |state| {
            state
                .index_map
                .get_or_insert_with(|| {
                    self.read_or_default(&self.paths.index_map_file(conversation_id))
                })
                .clone()
        })
    }

    pub fn resolve_index(&self, conversation_id: &str, index: usize) -> Option<String> {
        self.load_index_map(conversation_id).get(&index).cloned()
    }

    /// Cache and persist the rendered history map
    pub fn save_history_map(&self, conversation_id: &str, text: &str) -> Result<(), StoreError> {
        self.state.get_or_create(conversation_id, |state| {
            state.history_map = Some(text.to_string());
        });
        atomic_write(
            &self.paths.history_map_file(conversation_id),
            text.as_bytes(),
        )?;
        Ok(())
    }

    /// Most recently rendered history map, if any
    pub fn history_map(&self, conversation_id: &str) -> Option<String> {
        let text = self.state.get_or_create(conversation_id, |state| {
            state
                .history_map
                .get_or_insert_with(|| {
                    let path = self.paths.history_map_file(conversation_id);
                    match std::fs::read_to_string(&path) {
                        Ok(text) => text,
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
                        Err(e) => {
                            warn!(path = %path.display(), error = %e, "unreadable history map");
                            String::new()
                        }
                    }
                })
                .clone()
        });
        (!text.is_empty()).then_some(text)
    }

    /// Drop cached state for a conversation
    pub fn forget(&self, conversation_id: &str) -> bool {
        self.state.remove(conversation_id).is_some()
    }

    /// Drop cached and persisted state for a deleted conversation
    pub fn purge(&self, conversation_id: &str) -> Result<(), StoreError> {
        self.forget(conversation_id);
        match std::fs::remove_dir_all(self.paths.session_dir(conversation_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn is_cached(&self, conversation_id: &str) -> bool {
        self.state.contains(conversation_id)
    }

    /// Append a telemetry record; failures are logged only
    pub fn record_pass(&self, record: &PruneRecord) {
        if let Err(e) = append_jsonl(&self.paths.prune_log(), record) {
            warn!(error = %e, "failed to append prune telemetry");
        }
    }
}
