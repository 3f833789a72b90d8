use thiserror::Error;

/// Failures during a pruning pass. `PruningEngine::compact` never surfaces these;
/// it logs them and returns the log unchanged.
#[derive(Debug, Error)]
pub enum PruneError {
    #[error("tool call id {0} appears on more than one invocation")]
    DuplicateCallId(String),

    #[error("failed to canonicalize input of {tool}: {source}")]
    Canonicalize {
        tool: String,
        #[source]
        source: serde_json::Error,
    },
}
