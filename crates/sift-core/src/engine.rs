//! Multi-pass compaction of the event log
//!
//! Pass 1 indexes tool calls and turns, pass 2 evaluates manual overrides and
//! the automatic strategies into a [`PrunePlan`], pass 3 (reconciliation) is
//! folded into the plan's first-mark-wins rule, pass 4 rewrites payloads.

use crate::config::{
    PruningConfig, Strategies, CONTENT_FIELDS, DEDUP_TOOLS, PATH_FIELDS, READ_TOOLS, WRITE_TOOLS,
};
use crate::disposition::{Disposition, OverrideMap};
use crate::error::PruneError;
use crate::index::ToolCallIndex;
use crate::types::{Message, Part, ToolContent, ToolResult, ToolUse};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use tracing::{debug, warn};

/// Why a payload was replaced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PruneReason {
    Manual(Disposition),
    Deduplicated,
    Superseded { by: String },
    StaleError,
}

impl PruneReason {
    /// Replacement for a tool-result payload
    pub fn output_placeholder(&self) -> String {
        match self {
            PruneReason::Manual(Disposition::Extracted(summary)) => {
                format!("[Summary: {}]", summary)
            }
            other => format!("[Output pruned: {}]", other),
        }
    }

    /// Replacement for a large tool-input field
    pub fn input_placeholder(&self) -> String {
        format!("[Content pruned: {}]", self)
    }

    /// Stable label for telemetry
    pub fn kind(&self) -> &'static str {
        match self {
            PruneReason::Manual(Disposition::Extracted(_)) => "extracted",
            PruneReason::Manual(Disposition::Discarded(_)) => "discarded",
            PruneReason::Deduplicated => "deduplicated",
            PruneReason::Superseded { .. } => "superseded",
            PruneReason::StaleError => "stale_error",
        }
    }
}

impl fmt::Display for PruneReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PruneReason::Manual(disposition) => write!(f, "{}", disposition),
            PruneReason::Deduplicated => write!(f, "Deduplicated"),
            PruneReason::Superseded { by } => write!(f, "Superseded by read at {}", by),
            PruneReason::StaleError => write!(f, "Stale Error"),
        }
    }
}

/// Output of strategy evaluation: which payloads to replace, and why.
/// The first reason recorded for a call is final.
#[derive(Debug, Clone, Default)]
pub struct PrunePlan {
    manual: HashSet<String>,
    outputs: HashMap<String, PruneReason>,
    inputs: HashMap<String, PruneReason>,
}

impl PrunePlan {
    fn mark_manual(&mut self, id: &str, disposition: Disposition) {
        self.manual.insert(id.to_string());
        self.outputs
            .insert(id.to_string(), PruneReason::Manual(disposition));
    }

    fn mark_output(&mut self, id: &str, reason: PruneReason) {
        self.outputs.entry(id.to_string()).or_insert(reason);
    }

    fn mark_input(&mut self, id: &str, reason: PruneReason) {
        if self.manual.contains(id) {
            return;
        }
        self.inputs.entry(id.to_string()).or_insert(reason);
    }

    pub fn output_reason(&self, id: &str) -> Option<&PruneReason> {
        self.outputs.get(id)
    }

    pub fn input_reason(&self, id: &str) -> Option<&PruneReason> {
        self.inputs.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty() && self.inputs.is_empty()
    }

    /// Counts for the calls present in `index`
    pub fn stats(&self, index: &ToolCallIndex) -> PruneStats {
        let mut stats = PruneStats {
            tool_calls: index.len(),
            ..PruneStats::default()
        };
        for (id, reason) in &self.outputs {
            if index.contains(id) {
                stats.outputs_pruned += 1;
                *stats.by_reason.entry(reason.kind().to_string()).or_default() += 1;
            }
        }
        for (id, reason) in &self.inputs {
            if index.contains(id) {
                stats.inputs_pruned += 1;
                *stats.by_reason.entry(reason.kind().to_string()).or_default() += 1;
            }
        }
        stats
    }
}

/// Summary of one pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneStats {
    pub tool_calls: usize,
    pub outputs_pruned: usize,
    pub inputs_pruned: usize,
    pub by_reason: BTreeMap<String, usize>,
}

/// Result of a successful pass
#[derive(Debug, Clone)]
pub struct Compaction {
    pub messages: Vec<Message>,
    pub index: ToolCallIndex,
    pub plan: PrunePlan,
}

impl Compaction {
    pub fn stats(&self) -> PruneStats {
        self.plan.stats(&self.index)
    }
}

/// Working state of the strategy walk
#[derive(Default)]
struct Walk {
    read_hashes: HashMap<String, String>,
    last_writes: HashMap<String, String>,
    stale_errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PruningEngine {
    strategies: Strategies,
    protected: HashSet<String>,
}

impl PruningEngine {
    pub fn new(config: &PruningConfig) -> Self {
        Self {
            strategies: config.strategies.clone(),
            protected: config.protected_set(),
        }
    }

    pub fn strategies(&self) -> &Strategies {
        &self.strategies
    }

    pub fn is_protected(&self, tool: &str) -> bool {
        self.protected.contains(tool)
    }

    /// Best-effort compaction: on any analysis failure the log is returned unchanged
    pub fn compact(&self, log: &[Message], overrides: &OverrideMap) -> Vec<Message> {
        match self.try_compact(log, overrides) {
            Ok(compaction) => compaction.messages,
            Err(e) => {
                warn!(error = %e, "pruning failed, passing log through unchanged");
                log.to_vec()
            }
        }
    }

    pub fn try_compact(
        &self,
        log: &[Message],
        overrides: &OverrideMap,
    ) -> Result<Compaction, PruneError> {
        let index = ToolCallIndex::build(log)?;
        let plan = self.plan(log, &index, overrides)?;
        let messages = rewrite(log, &plan);

        debug!(
            tool_calls = index.len(),
            outputs = plan.outputs.len(),
            inputs = plan.inputs.len(),
            "pruning pass computed"
        );

        Ok(Compaction {
            messages,
            index,
            plan,
        })
    }

    /// Strategy evaluation over an already built index
    pub fn plan(
        &self,
        log: &[Message],
        index: &ToolCallIndex,
        overrides: &OverrideMap,
    ) -> Result<PrunePlan, PruneError> {
        let mut plan = PrunePlan::default();

        for (id, raw) in overrides {
            plan.mark_manual(id, Disposition::parse(raw));
        }

        let mut walk = Walk::default();
        for part in log.iter().flat_map(|m| m.parts.iter()) {
            match part {
                Part::ToolUse(call) => self.observe_call(call, &mut walk, &mut plan)?,
                Part::ToolResult(result) => self.observe_result(result, index, &mut walk, &mut plan),
                _ => {}
            }
        }

        // Stale errors rank below deduplication, so they are marked last
        for id in walk.stale_errors {
            plan.mark_output(&id, PruneReason::StaleError);
        }

        Ok(plan)
    }

    fn observe_call(
        &self,
        call: &ToolUse,
        walk: &mut Walk,
        plan: &mut PrunePlan,
    ) -> Result<(), PruneError> {
        let name = call.name();
        if self.is_protected(name) {
            return Ok(());
        }
        let empty = Map::new();
        let input = call.input.as_ref().unwrap_or(&empty);

        if self.strategies.deduplication && DEDUP_TOOLS.contains(&name) {
            let hash = call_hash(name, input)?;
            // Keep the freshest read; the earlier identical one goes
            if let Some(previous) = walk.read_hashes.insert(hash, call.tool_use_id.clone()) {
                plan.mark_output(&previous, PruneReason::Deduplicated);
            }
        }

        if self.strategies.supersede_writes && WRITE_TOOLS.contains(&name) {
            if let Some(path) = target_path(input) {
                walk.last_writes
                    .insert(path.to_string(), call.tool_use_id.clone());
            }
        }

        Ok(())
    }

    fn observe_result(
        &self,
        result: &ToolResult,
        index: &ToolCallIndex,
        walk: &mut Walk,
        plan: &mut PrunePlan,
    ) {
        let Some(info) = index.get(&result.tool_use_id) else {
            return;
        };
        if self.is_protected(&info.name) {
            return;
        }

        if self.strategies.supersede_writes && READ_TOOLS.contains(&info.name.as_str()) {
            if let Some(write_id) = target_path(&info.input).and_then(|p| walk.last_writes.get(p)) {
                if write_id != &info.id {
                    plan.mark_input(
                        write_id,
                        PruneReason::Superseded {
                            by: info.id.clone(),
                        },
                    );
                }
            }
        }

        let purge = &self.strategies.error_purge;
        if purge.enabled && info.is_error() {
            let age = index.final_turn().saturating_sub(info.turn_index);
            if age >= purge.turns_to_keep {
                walk.stale_errors.push(info.id.clone());
            }
        }
    }
}

/// Pass 4: replace payloads named by the plan, leave everything else as is
fn rewrite(log: &[Message], plan: &PrunePlan) -> Vec<Message> {
    log.iter()
        .map(|message| {
            let mut message = message.clone();
            for part in &mut message.parts {
                match part {
                    Part::ToolResult(result) => {
                        if let Some(reason) = plan.output_reason(&result.tool_use_id) {
                            result.content = Some(ToolContent::Text(reason.output_placeholder()));
                        }
                    }
                    Part::ToolUse(call) => {
                        let Some(reason) = plan.input_reason(&call.tool_use_id) else {
                            continue;
                        };
                        if let Some(input) = call.input.as_mut() {
                            for field in CONTENT_FIELDS {
                                if let Some(slot) = input.get_mut(*field) {
                                    *slot = Value::String(reason.input_placeholder());
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
            message
        })
        .collect()
}

/// File a write/read call targets
pub fn target_path(input: &Map<String, Value>) -> Option<&str> {
    PATH_FIELDS
        .iter()
        .filter_map(|field| input.get(*field).and_then(Value::as_str))
        .find(|path| !path.is_empty())
}

/// Dedup key: sha256 over the tool name and key-sorted canonical input
pub fn call_hash(name: &str, input: &Map<String, Value>) -> Result<String, PruneError> {
    let mut keys: Vec<&String> = input.keys().collect();
    keys.sort();

    let mut pairs = Vec::with_capacity(keys.len());
    for key in keys {
        let value = serde_json::to_string(&Canonical(&input[key.as_str()])).map_err(|source| {
            PruneError::Canonicalize {
                tool: name.to_string(),
                source,
            }
        })?;
        pairs.push(format!("{}:{}", key, value));
    }

    let digest = Sha256::digest(format!("{}:{}", name, pairs.join(",")).as_bytes());
    Ok(hex::encode(digest))
}

/// Serializes a JSON value with object keys sorted at every depth
struct Canonical<'a>(&'a Value);

impl Serialize for Canonical<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => {
                let sorted: BTreeMap<&String, Canonical> =
                    map.iter().map(|(k, v)| (k, Canonical(v))).collect();
                sorted.serialize(serializer)
            }
            Value::Array(items) => serializer.collect_seq(items.iter().map(Canonical)),
            other => other.serialize(serializer),
        }
    }
}
