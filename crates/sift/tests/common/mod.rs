#![allow(dead_code)]

use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Isolated state root and config file for one test
pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    pub fn new(pruning: bool) -> Self {
        let dir = TempDir::new().unwrap();
        let config = json!({
            "dcp": {"enabled": pruning},
            "agents": {"pollIntervalMs": 50, "timeoutSecs": 2},
            "pty": {"bufferLines": 500},
            "host": {"url": "http://127.0.0.1:9"}
        });
        std::fs::write(
            dir.path().join("sift.json"),
            serde_json::to_string_pretty(&config).unwrap(),
        )
        .unwrap();
        Self { dir }
    }

    pub fn config(&self) -> PathBuf {
        self.dir.path().join("sift.json")
    }

    pub fn state(&self) -> PathBuf {
        self.dir.path().join("state")
    }

    pub fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_sift"));
        cmd.args(args)
            .arg("--config")
            .arg(self.config())
            .env("SIFT_HOME", self.state())
            .env("RUST_LOG", "warn");
        cmd
    }

    /// Run a one-shot command with `input` on stdin
    pub fn run_raw(&self, args: &[&str], input: &str) -> Output {
        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        child
            .stdin
            .take()
            .unwrap()
            .write_all(input.as_bytes())
            .unwrap();
        child.wait_with_output().unwrap()
    }

    pub fn run(&self, args: &[&str], input: &Value) -> Value {
        let output = self.run_raw(args, &input.to_string());
        assert!(
            output.status.success(),
            "sift {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

/// A read, a grep, then the same read again
pub fn sample_log() -> Value {
    json!([
        {"info": {"role": "user"}, "parts": [{"type": "text", "text": "fix the parser"}]},
        {"info": {"role": "assistant"}, "parts": [
            {"type": "tool_use", "tool_use_id": "r1", "name": "read", "input": {"filePath": "/src/parse.rs"}}
        ]},
        {"info": {"role": "user"}, "parts": [
            {"type": "tool_result", "tool_use_id": "r1", "content": "fn parse() {}", "is_error": false}
        ]},
        {"info": {"role": "assistant"}, "parts": [
            {"type": "tool_use", "tool_use_id": "g1", "name": "grep", "input": {"pattern": "parse\\("}}
        ]},
        {"info": {"role": "user"}, "parts": [
            {"type": "tool_result", "tool_use_id": "g1", "content": "src/main.rs:4", "is_error": false}
        ]},
        {"info": {"role": "assistant"}, "parts": [
            {"type": "tool_use", "tool_use_id": "r2", "name": "read", "input": {"filePath": "/src/parse.rs"}}
        ]},
        {"info": {"role": "user"}, "parts": [
            {"type": "tool_result", "tool_use_id": "r2", "content": "fn parse() {}", "is_error": false}
        ]}
    ])
}

pub fn result_content(messages: &Value, message: usize) -> &str {
    messages[message]["parts"][0]["content"].as_str().unwrap()
}
