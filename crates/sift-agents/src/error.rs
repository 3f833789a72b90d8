use thiserror::Error;

/// Failures talking to the host's session API
#[derive(Debug, Error)]
pub enum HostError {
    #[error("host request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("host did not return a session id")]
    MissingSessionId,
}
