use crate::manager::PtyStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PtyError {
    #[error("PTY session {0} not found")]
    NotFound(String),

    #[error("PTY session {id} is not running (status: {status})")]
    NotRunning { id: String, status: PtyStatus },

    #[error("failed to spawn {command}: {message}")]
    Spawn { command: String, message: String },

    #[error("invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("PTY I/O error: {0}")]
    Io(#[from] std::io::Error),
}
