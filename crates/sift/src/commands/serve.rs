//! JSON-lines dispatcher
//!
//! One request per stdin line: `{"id", "method", "params"}`. One response per
//! stdout line: `{"id", "result"}` or `{"id", "error"}`. Hook events are
//! answered in order; tool calls run as tasks and may answer out of order.

use super::hooks::{apply_messages, apply_system, MessagesInput, SystemInput};
use super::tools::{Toolbox, ToolOutput};
use super::Runtime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sift_agents::{HostClient, HttpHostClient, Swarm};
use sift_hooks::HookRegistry;
use sift_pty::PtyManager;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Value, error: String) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionDeleted {
    #[serde(rename = "sessionID")]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    #[serde(rename = "sessionID")]
    session_id: String,
    tool: String,
    #[serde(default)]
    args: Value,
}

/// Process-wide state behind the dispatcher
pub struct Server {
    runtime: Runtime,
    registry: Mutex<HookRegistry>,
    swarm: Arc<Swarm>,
    pty: Arc<PtyManager>,
    tools: Toolbox,
}

impl Server {
    pub fn new(runtime: Runtime, client: Arc<dyn HostClient>) -> Self {
        let pty = Arc::new(PtyManager::new(runtime.config.pty.buffer_lines));
        let swarm = Arc::new(Swarm::new(client, runtime.config.agents.wait_options()));
        let registry = Mutex::new(runtime.registry(Some(Arc::clone(&pty))));
        let tools = Toolbox::new(
            Arc::clone(&runtime.store),
            Arc::clone(&swarm),
            Arc::clone(&pty),
        );
        Self {
            runtime,
            registry,
            swarm,
            pty,
            tools,
        }
    }

    fn registry(&self) -> MutexGuard<'_, HookRegistry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn pty(&self) -> &PtyManager {
        &self.pty
    }

    pub async fn handle(&self, request: Request) -> Response {
        debug!(method = %request.method, "request");
        match self.dispatch(&request.method, request.params).await {
            Ok(result) => Response::ok(request.id, result),
            Err(e) => {
                warn!(method = %request.method, error = %e, "request failed");
                Response::err(request.id, format!("{:#}", e))
            }
        }
    }

    async fn dispatch(&self, method: &str, params: Value) -> anyhow::Result<Value> {
        match method {
            "chat.messages.transform" => {
                let input: MessagesInput = serde_json::from_value(params)?;
                let output = {
                    let mut registry = self.registry();
                    apply_messages(&mut registry, input)
                };
                Ok(serde_json::to_value(output)?)
            }
            "chat.system.transform" => {
                let input: SystemInput = serde_json::from_value(params)?;
                let output = {
                    let mut registry = self.registry();
                    apply_system(&mut registry, input)
                };
                Ok(serde_json::to_value(output)?)
            }
            "session.deleted" => {
                let input: SessionDeleted = serde_json::from_value(params)?;
                self.registry().on_session_deleted(&input.session_id);
                if let Err(e) = self.runtime.store.purge(&input.session_id) {
                    warn!(session = %input.session_id, error = %e, "failed to remove conversation state");
                }
                let subagents = self.swarm.teardown(&input.session_id).await;
                info!(session = %input.session_id, subagents, "conversation cleaned up");
                Ok(serde_json::json!({ "subagents": subagents }))
            }
            "tool.execute" => {
                let call: ToolCall = serde_json::from_value(params)?;
                let output = self
                    .tools
                    .execute(&call.session_id, &call.tool, call.args)
                    .await?;
                Ok(serde_json::to_value(ToolOutput { output })?)
            }
            other => anyhow::bail!("unknown method: {}", other),
        }
    }

    /// Parse one input line; blank lines yield nothing
    pub async fn handle_line(&self, line: &str) -> Option<Response> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str::<Request>(line) {
            Ok(request) => Some(self.handle(request).await),
            Err(e) => Some(Response::err(Value::Null, format!("invalid request: {}", e))),
        }
    }
}

pub async fn run(config: Option<&Path>) -> anyhow::Result<()> {
    let runtime = Runtime::load(config)?;
    let client = HttpHostClient::new(&runtime.config.host.url, runtime.config.host.directory.clone())?;
    let server = Arc::new(Server::new(runtime, Arc::new(client)));
    info!("sift serve ready");

    let (tx, mut rx) = mpsc::unbounded_channel::<Response>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(response) = rx.recv().await {
            let mut line = serde_json::to_string(&response)?;
            line.push('\n');
            stdout.write_all(line.as_bytes()).await?;
            stdout.flush().await?;
        }
        Ok::<_, anyhow::Error>(())
    });

    let mut tasks = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        while tasks.try_join_next().is_some() {}

        let request = match serde_json::from_str::<Request>(line.trim()) {
            Ok(request) => request,
            Err(_) if line.trim().is_empty() => continue,
            Err(e) => {
                let _ = tx.send(Response::err(Value::Null, format!("invalid request: {}", e)));
                continue;
            }
        };

        if request.method == "tool.execute" {
            let server = Arc::clone(&server);
            let tx = tx.clone();
            tasks.spawn(async move {
                let _ = tx.send(server.handle(request).await);
            });
        } else {
            let _ = tx.send(server.handle(request).await);
        }
    }

    // Host went away: abandon in-flight tools and kill every terminal
    tasks.shutdown().await;
    let killed = server.pty().cleanup_all();
    info!(killed, "stdin closed, shutting down");
    drop(tx);
    writer.await??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiftConfig;
    use async_trait::async_trait;
    use serde_json::json;
    use sift_agents::{HostError, HostMessage, PromptRequest, SessionStatus};
    use sift_core::PruningConfig;
    use sift_store::Paths;
    use std::collections::HashMap;

    /// Host whose every call fails; enough to exercise dispatch paths
    struct OfflineHost;

    #[async_trait]
    impl HostClient for OfflineHost {
        async fn messages(&self, _session_id: &str) -> Result<Vec<HostMessage>, HostError> {
            Err(HostError::MissingSessionId)
        }

        async fn create_session(&self, _parent_id: &str, _title: &str) -> Result<String, HostError> {
            Err(HostError::Status {
                endpoint: "/session".to_string(),
                status: 503,
                body: "offline".to_string(),
            })
        }

        async fn prompt_async(
            &self,
            _session_id: &str,
            _request: &PromptRequest,
        ) -> Result<(), HostError> {
            Ok(())
        }

        async fn statuses(&self) -> Result<HashMap<String, SessionStatus>, HostError> {
            Ok(HashMap::new())
        }

        async fn delete_session(&self, _session_id: &str) -> Result<(), HostError> {
            Ok(())
        }
    }

    fn server(dir: &tempfile::TempDir) -> Server {
        let config = SiftConfig {
            dcp: PruningConfig::new(),
            ..SiftConfig::default()
        };
        Server::new(
            Runtime::new(Paths::with_root(dir.path()), config),
            Arc::new(OfflineHost),
        )
    }

    async fn call(server: &Server, line: Value) -> Response {
        server.handle_line(&line.to_string()).await.unwrap()
    }

    #[tokio::test]
    async fn test_invalid_and_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        assert!(server.handle_line("   ").await.is_none());

        let response = server.handle_line("{oops").await.unwrap();
        assert_eq!(response.id, Value::Null);
        assert!(response.error.unwrap().starts_with("invalid request"));
    }

    #[tokio::test]
    async fn test_unknown_method_and_tool() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);

        let response = call(&server, json!({"id": 1, "method": "nope"})).await;
        assert_eq!(response.id, json!(1));
        assert_eq!(response.error.as_deref(), Some("unknown method: nope"));

        let response = call(
            &server,
            json!({"id": 2, "method": "tool.execute", "params": {"sessionID": "s", "tool": "fly"}}),
        )
        .await;
        assert_eq!(response.error.as_deref(), Some("unknown tool: fly"));
    }

    #[tokio::test]
    async fn test_transform_then_extract_round() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        let messages = json!([
            {"info": {"role": "assistant"}, "parts": [
                {"type": "tool_use", "tool_use_id": "g1", "name": "glob", "input": {"pattern": "**/*.rs"}}
            ]},
            {"info": {"role": "user"}, "parts": [
                {"type": "tool_result", "tool_use_id": "g1", "content": "src/lib.rs", "is_error": false}
            ]}
        ]);

        let transform = json!({
            "id": "t1",
            "method": "chat.messages.transform",
            "params": {"sessionID": "ses_a", "messages": messages}
        });
        let response = call(&server, transform.clone()).await;
        assert_eq!(response.result.unwrap()["messages"][1]["parts"][0]["content"], "src/lib.rs");

        let response = call(
            &server,
            json!({"id": "t2", "method": "chat.system.transform", "params": {"sessionID": "ses_a", "system": []}}),
        )
        .await;
        let system = response.result.unwrap()["system"].clone();
        assert!(system[0].as_str().unwrap().contains("1. glob(\"**/*.rs\")"));

        let response = call(
            &server,
            json!({"id": "t3", "method": "tool.execute", "params": {
                "sessionID": "ses_a", "tool": "discard", "args": {"ids": [1], "reason": "noise"}
            }}),
        )
        .await;
        assert!(response.result.unwrap()["output"]
            .as_str()
            .unwrap()
            .starts_with("Successfully discarded ID 1."));

        let response = call(&server, transform).await;
        assert_eq!(
            response.result.unwrap()["messages"][1]["parts"][0]["content"],
            "[Output pruned: Discarded: noise]"
        );
    }

    #[tokio::test]
    async fn test_stray_part_returns_log_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        let messages = json!([
            {"info": {"role": "assistant"}, "parts": ["stray string part"]},
            {"info": {"role": "user"}, "parts": [{"type": "text", "text": "go on"}]}
        ]);
        let response = call(
            &server,
            json!({"id": 4, "method": "chat.messages.transform",
                   "params": {"sessionID": "ses_a", "messages": messages}}),
        )
        .await;
        assert!(response.error.is_none());
        assert_eq!(response.result.unwrap()["messages"], messages);

        let broken = json!([{"info": "nope", "parts": {}}]);
        let response = call(
            &server,
            json!({"id": 5, "method": "chat.messages.transform",
                   "params": {"sessionID": "ses_a", "messages": broken}}),
        )
        .await;
        assert_eq!(response.result.unwrap()["messages"], broken);
    }

    #[tokio::test]
    async fn test_extract_applies_valid_ids_beside_bad_ones() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        let map: sift_core::IndexMap = [(1, "call_a".to_string())].into_iter().collect();
        server.runtime.store.save_index_map("s", &map).unwrap();

        let output = server
            .tools
            .execute("s", "extract", json!({"ids": [1, -3], "summary": "X"}))
            .await
            .unwrap();
        assert!(output.contains("Successfully extracted ID 1."));
        assert!(output.contains("Error: ID -3 not found in history map."));
        assert_eq!(
            server.runtime.store.load("s").get("call_a").map(String::as_str),
            Some("X")
        );
    }

    #[tokio::test]
    async fn test_spawn_failure_is_report_text() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        let response = call(
            &server,
            json!({"id": 5, "method": "tool.execute", "params": {
                "sessionID": "ses_a", "tool": "spawn_agent",
                "args": {"agent": "explore", "prompt": "map the repo", "description": "survey"}
            }}),
        )
        .await;
        assert!(response.error.is_none());
        let output = response.result.unwrap()["output"].as_str().unwrap().to_string();
        assert!(output.starts_with("## spawn_agent Failed"));
        assert!(output.contains("**Agent**: explore"));
    }

    #[tokio::test]
    async fn test_wait_for_idle_unknown_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        let response = call(
            &server,
            json!({"id": 6, "method": "tool.execute", "params": {
                "sessionID": "ses_a", "tool": "wait_for_agents", "args": {"sessionIDs": []}
            }}),
        )
        .await;
        let output = response.result.unwrap()["output"].as_str().unwrap().to_string();
        assert!(output.starts_with("## No Sessions Provided"));
    }

    #[tokio::test]
    async fn test_pty_errors_propagate() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        let response = call(
            &server,
            json!({"id": 7, "method": "tool.execute", "params": {
                "sessionID": "ses_a", "tool": "pty_write", "args": {"id": "pty_00000000", "data": "ls\\n"}
            }}),
        )
        .await;
        let error = response.error.unwrap();
        assert!(error.contains("pty_00000000"));
        assert!(error.contains("not found"));

        let response = call(
            &server,
            json!({"id": 8, "method": "tool.execute", "params": {"sessionID": "ses_a", "tool": "pty_list"}}),
        )
        .await;
        assert!(response.result.unwrap()["output"]
            .as_str()
            .unwrap()
            .contains("No active PTY sessions."));
    }

    #[tokio::test]
    async fn test_session_deleted_purges_state() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        let session_dir = server.runtime.paths.session_dir("ses_gone");
        server
            .runtime
            .store
            .save_history_map("ses_gone", "<history_map></history_map>")
            .unwrap();
        assert!(session_dir.exists());

        let response = call(
            &server,
            json!({"id": 9, "method": "session.deleted", "params": {"sessionID": "ses_gone"}}),
        )
        .await;
        assert_eq!(response.result.unwrap()["subagents"], 0);
        assert!(!session_dir.exists());
    }
}
