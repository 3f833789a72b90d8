//! Persistent per-conversation state: manual overrides, the stable index map,
//! the rendered history map and pruning telemetry.

mod error;
mod io;
mod overrides;
mod paths;
mod session;
mod types;

pub use error::StoreError;
pub use io::{append_jsonl, atomic_write, read_json, read_jsonl, write_json};
pub use overrides::{BatchReport, ConversationState, OverrideStore};
pub use paths::{sanitize_id, Paths};
pub use session::SessionRegistry;
pub use types::PruneRecord;
