use super::{read_stdin, write_stdout, Runtime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sift_core::Message;
use sift_hooks::HookRegistry;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct MessagesInput {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    /// Decoded lazily; a log that does not parse is echoed back as-is
    #[serde(default)]
    pub messages: Value,
}

#[derive(Debug, Serialize)]
pub struct MessagesOutput {
    pub messages: Value,
}

#[derive(Debug, Deserialize)]
pub struct SystemInput {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    #[serde(default)]
    pub system: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SystemOutput {
    pub system: Vec<String>,
}

pub fn apply_messages(registry: &mut HookRegistry, input: MessagesInput) -> MessagesOutput {
    if input.messages.is_null() {
        return MessagesOutput {
            messages: Value::Array(Vec::new()),
        };
    }
    let log = match Vec::<Message>::deserialize(&input.messages) {
        Ok(log) => log,
        Err(e) => {
            warn!(session = %input.session_id, error = %e, "unexpected message log shape, passing through");
            return MessagesOutput {
                messages: input.messages,
            };
        }
    };

    let log = registry.on_messages(&input.session_id, log);
    match serde_json::to_value(log) {
        Ok(messages) => MessagesOutput { messages },
        Err(e) => {
            warn!(session = %input.session_id, error = %e, "failed to encode message log, passing through");
            MessagesOutput {
                messages: input.messages,
            }
        }
    }
}

/// Host fragments first, hook fragments appended
pub fn apply_system(registry: &mut HookRegistry, input: SystemInput) -> SystemOutput {
    let mut system = input.system;
    system.extend(registry.on_system(&input.session_id));
    SystemOutput { system }
}

pub fn messages_transform(config: Option<&Path>) -> anyhow::Result<()> {
    let input: MessagesInput = read_stdin()?;
    let runtime = Runtime::load(config)?;
    let mut registry = runtime.registry(None);
    write_stdout(&apply_messages(&mut registry, input))
}

pub fn system_transform(config: Option<&Path>) -> anyhow::Result<()> {
    let input: SystemInput = read_stdin()?;
    let runtime = Runtime::load(config)?;
    let mut registry = runtime.registry(None);
    write_stdout(&apply_system(&mut registry, input))
}
