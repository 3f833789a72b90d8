//! Spawning a sub-agent session

use crate::client::HostClient;
use crate::error::HostError;
use crate::types::{inherited_model, PromptRequest};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub agent: String,
    pub prompt: String,
    pub description: String,
}

/// Handle of a triggered sub-agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spawned {
    pub session_id: String,
    pub agent: String,
    pub description: String,
}

impl Spawned {
    pub fn render(&self) -> String {
        format!(
            "## Session Triggered\n\n**Agent**: {}\n**Task**: {}\n**SessionID**: {}\n\n*Use wait_for_agents with this SessionID to collect results.*",
            self.agent, self.description, self.session_id
        )
    }
}

impl SpawnRequest {
    pub fn title(&self) -> String {
        format!("Subagent: {} - {}", self.agent, self.description)
    }

    pub fn render_failure(&self, error: &HostError) -> String {
        format!(
            "## spawn_agent Failed\n\n**Agent**: {}\n**Error**: {}",
            self.agent, error
        )
    }
}

/// Create a child of `parent_id` running `request.agent` and start its turn.
/// Returns as soon as the host has accepted the prompt.
pub async fn spawn_agent(
    client: &dyn HostClient,
    parent_id: &str,
    request: &SpawnRequest,
) -> Result<Spawned, HostError> {
    let model = match client.messages(parent_id).await {
        Ok(messages) => inherited_model(&messages),
        Err(e) => {
            warn!(parent = parent_id, error = %e, "could not read parent model, using host default");
            None
        }
    };

    let session_id = client.create_session(parent_id, &request.title()).await?;
    let prompt = PromptRequest::new(&request.agent, &request.prompt, model);
    if let Err(e) = client.prompt_async(&session_id, &prompt).await {
        // The child never started; nothing would track or delete it later
        if let Err(cleanup) = client.delete_session(&session_id).await {
            warn!(child = %session_id, error = %cleanup, "failed to delete unprompted sub-agent session");
        }
        return Err(e);
    }

    info!(parent = parent_id, child = %session_id, agent = %request.agent, "sub-agent triggered");
    Ok(Spawned {
        session_id,
        agent: request.agent.clone(),
        description: request.description.clone(),
    })
}
