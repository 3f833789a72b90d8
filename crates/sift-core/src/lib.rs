//! Context pruning: event log model, tool-call indexing, the compaction engine
//! and the history map renderer. Pure computation, no I/O.

mod config;
mod disposition;
mod engine;
mod error;
pub mod history;
mod index;
mod types;

pub use config::{
    ErrorPurge, PruningConfig, Strategies, CONTENT_FIELDS, DEDUP_TOOLS, PATH_FIELDS, READ_TOOLS,
    WRITE_TOOLS,
};
pub use disposition::{Disposition, IndexMap, OverrideMap, DISCARD_MARKER};
pub use engine::{call_hash, target_path, Compaction, PrunePlan, PruneReason, PruneStats, PruningEngine};
pub use error::PruneError;
pub use index::{CallStatus, ToolCallIndex, ToolCallInfo};
pub use types::{Message, MessageInfo, Part, Role, TextPart, ToolContent, ToolResult, ToolUse};
