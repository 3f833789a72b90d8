//! Interactive pseudo-terminal sessions with bounded output buffers

mod buffer;
mod error;
pub mod escape;
pub mod format;
mod manager;

pub use buffer::{RingBuffer, SearchMatch, DEFAULT_BUFFER_LINES};
pub use error::PtyError;
pub use manager::{PtyManager, PtyStatus, ReadResult, SearchResult, SessionInfo, SpawnOptions};
