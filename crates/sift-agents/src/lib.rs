//! Fire-and-forget sub-agent sessions and the barrier that collects them

mod client;
mod error;
mod spawn;
mod swarm;
mod types;
mod wait;

pub use client::{HostClient, HttpHostClient};
pub use error::HostError;
pub use spawn::{spawn_agent, SpawnRequest, Spawned};
pub use swarm::Swarm;
pub use types::{
    final_text, inherited_model, HostMessage, HostMessageInfo, HostPart, ModelRef, PromptRequest,
    SessionStatus, TextInput,
};
pub use wait::{
    wait_for_agents, AgentOutcome, AgentReport, WaitOptions, WaitReport, MAX_STATUS_FAILURES,
};
