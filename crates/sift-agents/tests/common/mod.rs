//! Scripted in-memory host for spawn/wait tests

use async_trait::async_trait;
use serde_json::json;
use sift_agents::{HostClient, HostError, HostMessage, PromptRequest, SessionStatus};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

pub type StatusMap = HashMap<String, SessionStatus>;

#[derive(Default)]
pub struct MockState {
    pub messages: HashMap<String, Vec<HostMessage>>,
    /// Consumed one per status query; `Err` simulates a failing host
    pub status_script: VecDeque<Result<StatusMap, u16>>,
    /// Returned once the script runs out
    pub default_status: StatusMap,
    pub fail_create: bool,
    pub fail_prompt: bool,
    pub fail_messages: HashSet<String>,
    pub fail_delete: bool,
    pub created: Vec<(String, String)>,
    pub prompts: Vec<(String, serde_json::Value)>,
    pub deleted: Vec<String>,
    pub status_calls: usize,
    next_id: usize,
}

#[derive(Default)]
pub struct MockHost {
    state: Mutex<MockState>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

fn http_error(endpoint: &str, status: u16) -> HostError {
    HostError::Status {
        endpoint: endpoint.to_string(),
        status,
        body: "scripted failure".to_string(),
    }
}

#[async_trait]
impl HostClient for MockHost {
    async fn messages(&self, session_id: &str) -> Result<Vec<HostMessage>, HostError> {
        let state = self.state();
        if state.fail_messages.contains(session_id) {
            return Err(http_error("/session/message", 500));
        }
        Ok(state.messages.get(session_id).cloned().unwrap_or_default())
    }

    async fn create_session(&self, parent_id: &str, title: &str) -> Result<String, HostError> {
        let mut state = self.state();
        if state.fail_create {
            return Err(HostError::MissingSessionId);
        }
        state.next_id += 1;
        let id = format!("ses_child{}", state.next_id);
        state.created.push((parent_id.to_string(), title.to_string()));
        Ok(id)
    }

    async fn prompt_async(&self, session_id: &str, request: &PromptRequest) -> Result<(), HostError> {
        let body = serde_json::to_value(request).unwrap();
        let mut state = self.state();
        if state.fail_prompt {
            return Err(http_error("/session/prompt_async", 500));
        }
        state.prompts.push((session_id.to_string(), body));
        Ok(())
    }

    async fn statuses(&self) -> Result<StatusMap, HostError> {
        let mut state = self.state();
        state.status_calls += 1;
        match state.status_script.pop_front() {
            Some(Ok(map)) => Ok(map),
            Some(Err(code)) => Err(http_error("/session/status", code)),
            None => Ok(state.default_status.clone()),
        }
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), HostError> {
        let mut state = self.state();
        state.deleted.push(session_id.to_string());
        if state.fail_delete {
            return Err(http_error("/session", 404));
        }
        Ok(())
    }
}

pub fn statuses(entries: &[(&str, SessionStatus)]) -> StatusMap {
    entries
        .iter()
        .map(|(id, status)| (id.to_string(), status.clone()))
        .collect()
}

pub fn assistant_reply(text: &str) -> Vec<HostMessage> {
    serde_json::from_value(json!([
        {"info": {"role": "user"}, "parts": [{"type": "text", "text": "do it"}]},
        {"info": {"role": "assistant", "providerID": "anthropic", "modelID": "m1"},
         "parts": [{"type": "text", "text": text}]}
    ]))
    .unwrap()
}

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
