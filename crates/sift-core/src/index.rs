//! Per-pass tool-call index

use crate::disposition::IndexMap;
use crate::error::PruneError;
use crate::types::{Message, Part};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Success,
    Error,
}

/// One tool invocation as seen in the log
#[derive(Debug, Clone)]
pub struct ToolCallInfo {
    pub id: String,
    pub name: String,
    pub input: Map<String, Value>,
    pub status: CallStatus,
    /// 1-based turn the call was made in (0 if before any user turn)
    pub turn_index: usize,
    /// 1-based position among all invocations; the stable index
    pub position: usize,
}

impl ToolCallInfo {
    pub fn is_error(&self) -> bool {
        self.status == CallStatus::Error
    }
}

/// Tool calls indexed in log order. Rebuilt from scratch on every pass.
#[derive(Debug, Clone, Default)]
pub struct ToolCallIndex {
    calls: Vec<ToolCallInfo>,
    by_id: HashMap<String, usize>,
    final_turn: usize,
}

impl ToolCallIndex {
    pub fn build(log: &[Message]) -> Result<Self, PruneError> {
        let mut index = Self::default();
        let mut turn = 0usize;

        for message in log {
            if message.starts_turn() {
                turn += 1;
            }

            for part in &message.parts {
                match part {
                    Part::ToolUse(call) => {
                        if index.by_id.contains_key(&call.tool_use_id) {
                            return Err(PruneError::DuplicateCallId(call.tool_use_id.clone()));
                        }
                        let position = index.calls.len() + 1;
                        index
                            .by_id
                            .insert(call.tool_use_id.clone(), index.calls.len());
                        index.calls.push(ToolCallInfo {
                            id: call.tool_use_id.clone(),
                            name: call.name().to_string(),
                            input: call.input.clone().unwrap_or_default(),
                            status: CallStatus::Success,
                            turn_index: turn,
                            position,
                        });
                    }
                    Part::ToolResult(result) if result.is_error() => {
                        if let Some(&slot) = index.by_id.get(&result.tool_use_id) {
                            index.calls[slot].status = CallStatus::Error;
                        }
                    }
                    _ => {}
                }
            }
        }

        index.final_turn = turn;
        Ok(index)
    }

    pub fn get(&self, id: &str) -> Option<&ToolCallInfo> {
        self.by_id.get(id).map(|&slot| &self.calls[slot])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolCallInfo> {
        self.calls.iter()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Turn counter value after the last message
    pub fn final_turn(&self) -> usize {
        self.final_turn
    }

    /// Stable index -> call id for the current log order
    pub fn stable_index_map(&self) -> IndexMap {
        self.calls
            .iter()
            .map(|call| (call.position, call.id.clone()))
            .collect()
    }
}
