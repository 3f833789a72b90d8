//! Bookkeeping of which conversation spawned which sub-agents

use crate::client::HostClient;
use crate::spawn::{spawn_agent, SpawnRequest};
use crate::wait::{wait_for_agents, WaitOptions};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

/// Spawn/wait front end that remembers live children per parent conversation
pub struct Swarm {
    client: Arc<dyn HostClient>,
    options: WaitOptions,
    children: Mutex<HashMap<String, Vec<String>>>,
}

impl Swarm {
    pub fn new(client: Arc<dyn HostClient>, options: WaitOptions) -> Self {
        Self {
            client,
            options,
            children: Mutex::new(HashMap::new()),
        }
    }

    fn children(&self) -> MutexGuard<'_, HashMap<String, Vec<String>>> {
        self.children.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Tool entry point; failures come back as report text
    pub async fn spawn(&self, parent_id: &str, request: &SpawnRequest) -> String {
        match spawn_agent(self.client.as_ref(), parent_id, request).await {
            Ok(spawned) => {
                self.children()
                    .entry(parent_id.to_string())
                    .or_default()
                    .push(spawned.session_id.clone());
                spawned.render()
            }
            Err(e) => request.render_failure(&e),
        }
    }

    /// Tool entry point. `timeout` replaces the configured bound when given;
    /// `Some(None)` waits without a bound.
    pub async fn wait(&self, session_ids: &[String], timeout: Option<Option<Duration>>) -> String {
        let options = WaitOptions {
            timeout: timeout.unwrap_or(self.options.timeout),
            ..self.options
        };
        let report = wait_for_agents(self.client.as_ref(), session_ids, &options).await;

        let done: Vec<&str> = report.completed().collect();
        if !done.is_empty() {
            let mut children = self.children();
            for list in children.values_mut() {
                list.retain(|id| !done.contains(&id.as_str()));
            }
            children.retain(|_, list| !list.is_empty());
        }
        report.render()
    }

    pub fn tracked(&self, parent_id: &str) -> Vec<String> {
        self.children().get(parent_id).cloned().unwrap_or_default()
    }

    /// Delete every live child of a conversation; returns how many were tracked
    pub async fn teardown(&self, parent_id: &str) -> usize {
        let Some(ids) = self.children().remove(parent_id) else {
            return 0;
        };
        for id in &ids {
            if let Err(e) = self.client.delete_session(id).await {
                debug!(session = %id, error = %e, "sub-agent teardown failed");
            }
        }
        info!(parent = parent_id, count = ids.len(), "sub-agents torn down");
        ids.len()
    }
}
