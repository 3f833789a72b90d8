//! Tool-shaped operations exposed to the agent

use super::{read_stdin, write_stdout, Runtime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sift_agents::{SpawnRequest, Swarm};
use sift_core::Disposition;
use sift_pty::{format, PtyManager, SpawnOptions};
use sift_store::OverrideStore;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Arguments of `extract` (`summary`) and `discard` (`reason`)
#[derive(Debug, Deserialize)]
pub struct OverrideArgs {
    /// Kept loose so one bad item cannot sink the batch
    #[serde(default)]
    pub ids: Vec<Value>,
    #[serde(default, alias = "reason")]
    pub summary: String,
}

#[derive(Debug, Deserialize)]
struct OverrideInput {
    #[serde(rename = "sessionID")]
    session_id: String,
    #[serde(flatten)]
    args: OverrideArgs,
}

#[derive(Debug, Serialize)]
pub struct ToolOutput {
    pub output: String,
}

#[derive(Debug, Deserialize)]
struct SpawnArgs {
    agent: String,
    prompt: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct WaitArgs {
    #[serde(rename = "sessionIDs", default)]
    session_ids: Vec<String>,
    /// Per-call bound; 0 waits without one
    #[serde(rename = "timeoutSeconds", default)]
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PtySpawnArgs {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    workdir: Option<PathBuf>,
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PtyWriteArgs {
    id: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct PtyReadArgs {
    id: String,
    #[serde(default)]
    offset: usize,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    pattern: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PtyKillArgs {
    id: String,
    #[serde(default)]
    cleanup: bool,
}

/// Resolve indices and record one disposition for each
pub fn apply_override(
    store: &OverrideStore,
    session_id: &str,
    args: OverrideArgs,
    make: fn(String) -> Disposition,
) -> String {
    if args.ids.is_empty() {
        return "Error: no IDs provided. Pass the indices from the <history_map> block.".to_string();
    }

    let mut indices = Vec::new();
    let mut invalid = Vec::new();
    for id in &args.ids {
        match history_index(id) {
            Some(index) => indices.push(index),
            None => invalid.push(match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
        }
    }

    let mut report = store.apply_batch(session_id, &indices, &make(args.summary));
    report.invalid = invalid;
    report.render()
}

/// A positive integer, or a string holding one
fn history_index(id: &Value) -> Option<usize> {
    let index = match id {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    usize::try_from(index).ok().filter(|&i| i > 0)
}

/// One-shot `tool:extract` / `tool:discard`
pub fn run(config: Option<&Path>, make: fn(String) -> Disposition) -> anyhow::Result<()> {
    let input: OverrideInput = read_stdin()?;
    let runtime = Runtime::load(config)?;
    let output = apply_override(&runtime.store, &input.session_id, input.args, make);
    write_stdout(&ToolOutput { output })
}

/// Every tool the `serve` dispatcher can execute
pub struct Toolbox {
    store: Arc<OverrideStore>,
    swarm: Arc<Swarm>,
    pty: Arc<PtyManager>,
}

impl Toolbox {
    pub fn new(store: Arc<OverrideStore>, swarm: Arc<Swarm>, pty: Arc<PtyManager>) -> Self {
        Self { store, swarm, pty }
    }

    /// Host failures come back as report text; PTY misuse and bad arguments are errors
    pub async fn execute(&self, session_id: &str, tool: &str, args: Value) -> anyhow::Result<String> {
        let output = match tool {
            "extract" => apply_override(
                &self.store,
                session_id,
                serde_json::from_value(args)?,
                Disposition::Extracted,
            ),
            "discard" => apply_override(
                &self.store,
                session_id,
                serde_json::from_value(args)?,
                Disposition::Discarded,
            ),
            "spawn_agent" => {
                let args: SpawnArgs = serde_json::from_value(args)?;
                let request = SpawnRequest {
                    agent: args.agent,
                    prompt: args.prompt,
                    description: args.description,
                };
                self.swarm.spawn(session_id, &request).await
            }
            "wait_for_agents" => {
                let args: WaitArgs = serde_json::from_value(args)?;
                let timeout = args
                    .timeout_seconds
                    .map(|secs| (secs > 0).then(|| Duration::from_secs(secs)));
                self.swarm.wait(&args.session_ids, timeout).await
            }
            "pty_spawn" => {
                let args: PtySpawnArgs = serde_json::from_value(args)?;
                let mut options = SpawnOptions::new(args.command)
                    .args(args.args)
                    .parent(session_id);
                options.workdir = args.workdir;
                options.env = args.env;
                options.title = args.title;
                format::spawned(&self.pty.spawn(options)?)
            }
            "pty_write" => {
                let args: PtyWriteArgs = serde_json::from_value(args)?;
                let bytes = self.pty.write(&args.id, &args.data)?;
                format::written(&args.id, bytes)
            }
            "pty_read" => {
                let args: PtyReadArgs = serde_json::from_value(args)?;
                match args.pattern {
                    Some(pattern) => {
                        let result = self.pty.search(&args.id, &pattern)?;
                        format::search(&args.id, &pattern, &result)
                    }
                    None => {
                        let result = self.pty.read(&args.id, args.offset, args.limit)?;
                        format::output(&args.id, &result)
                    }
                }
            }
            "pty_list" => format::list(&self.pty.list()),
            "pty_kill" => {
                let args: PtyKillArgs = serde_json::from_value(args)?;
                let info = self.pty.kill(&args.id, args.cleanup)?;
                format::killed(&info, args.cleanup)
            }
            other => anyhow::bail!("unknown tool: {}", other),
        };
        Ok(output)
    }
}
