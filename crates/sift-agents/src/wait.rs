//! Polling barrier over sub-agent sessions

use crate::client::HostClient;
use crate::types::final_text;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Consecutive status-query failures tolerated before giving up
pub const MAX_STATUS_FAILURES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub poll_interval: Duration,
    /// `None` polls until every session is idle
    pub timeout: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1500),
            timeout: Some(Duration::from_secs(1800)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutcome {
    /// Idle; carries the last assistant text, if any
    Completed(Option<String>),
    /// Still running at the deadline; the session is left alone
    TimedOut,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReport {
    pub session_id: String,
    pub outcome: AgentOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitReport {
    pub agents: Vec<AgentReport>,
    pub timeout: Option<Duration>,
}

impl WaitReport {
    pub fn completed(&self) -> impl Iterator<Item = &str> {
        self.agents
            .iter()
            .filter(|a| matches!(a.outcome, AgentOutcome::Completed(_)))
            .map(|a| a.session_id.as_str())
    }

    pub fn render(&self) -> String {
        if self.agents.is_empty() {
            return "## No Sessions Provided\n\nPlease provide at least one SessionID to wait for."
                .to_string();
        }

        let mut out = format!(
            "## Swarm Execution Report\n\n**Total Agents**: {}\n\n---\n\n",
            self.agents.len()
        );
        for agent in &self.agents {
            let body = match &agent.outcome {
                AgentOutcome::Completed(Some(text)) => text.clone(),
                AgentOutcome::Completed(None) => "(No response from agent)".to_string(),
                AgentOutcome::TimedOut => format!(
                    "**Timed out**: still running after {}s. Call wait_for_agents again with this SessionID to keep waiting.",
                    self.timeout.map(|t| t.as_secs()).unwrap_or_default()
                ),
                AgentOutcome::Failed(error) => format!("**Error**: {}", error),
            };
            out.push_str(&format!("### Session: {}\n\n{}\n\n---\n\n", agent.session_id, body));
        }
        out
    }
}

/// Poll until every session is idle (or missing), then collect each final
/// answer and delete the finished sessions. Duplicate ids are collapsed.
pub async fn wait_for_agents(
    client: &dyn HostClient,
    session_ids: &[String],
    options: &WaitOptions,
) -> WaitReport {
    let mut ids: Vec<String> = Vec::with_capacity(session_ids.len());
    for id in session_ids {
        if !ids.contains(id) {
            ids.push(id.clone());
        }
    }

    let deadline = options.timeout.map(|t| Instant::now() + t);
    let mut pending = ids.clone();
    let mut failures = 0u32;
    let mut poll_error: Option<String> = None;

    while !pending.is_empty() {
        match client.statuses().await {
            Ok(statuses) => {
                failures = 0;
                pending.retain(|id| statuses.get(id).is_some_and(|s| !s.is_idle()));
            }
            Err(e) => {
                failures += 1;
                warn!(attempt = failures, error = %e, "session status query failed");
                if failures >= MAX_STATUS_FAILURES {
                    poll_error = Some(e.to_string());
                    break;
                }
            }
        }

        if pending.is_empty() {
            break;
        }
        let mut wake = Instant::now() + options.poll_interval;
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                break;
            }
            wake = wake.min(deadline);
        }
        debug!(pending = pending.len(), "waiting for sub-agents");
        tokio::time::sleep_until(wake).await;
    }

    let mut agents = Vec::with_capacity(ids.len());
    for id in ids {
        let outcome = if pending.contains(&id) {
            match &poll_error {
                Some(error) => AgentOutcome::Failed(format!("Status polling failed: {}", error)),
                None => AgentOutcome::TimedOut,
            }
        } else {
            match client.messages(&id).await {
                Ok(messages) => {
                    if let Err(e) = client.delete_session(&id).await {
                        debug!(session = %id, error = %e, "sub-agent cleanup failed");
                    }
                    AgentOutcome::Completed(final_text(&messages))
                }
                Err(e) => AgentOutcome::Failed(format!("Failed to retrieve results: {}", e)),
            }
        };
        agents.push(AgentReport {
            session_id: id,
            outcome,
        });
    }

    WaitReport {
        agents,
        timeout: options.timeout,
    }
}
