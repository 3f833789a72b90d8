//! PTY session registry
//!
//! Each session owns a pseudo-terminal master, a writer into the child's
//! input, and a shared ring buffer filled by a reader thread. A waiter thread
//! records the exit code unless the session was killed first.

use crate::buffer::{RingBuffer, SearchMatch, DEFAULT_BUFFER_LINES};
use crate::error::PtyError;
use crate::escape;
use chrono::{DateTime, Utc};
use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty, PtySize};
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PtyStatus {
    Running,
    Exited,
    Killed,
}

impl fmt::Display for PtyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PtyStatus::Running => "running",
            PtyStatus::Exited => "exited",
            PtyStatus::Killed => "killed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpawnOptions {
    pub command: String,
    pub args: Vec<String>,
    pub workdir: Option<PathBuf>,
    pub env: HashMap<String, String>,
    /// Defaults to the command line
    pub title: Option<String>,
    /// Conversation that owns the session
    pub parent_session_id: Option<String>,
}

impl SpawnOptions {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn parent(mut self, session_id: impl Into<String>) -> Self {
        self.parent_session_id = Some(session_id.into());
        self
    }

    fn command_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Snapshot of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub title: String,
    pub command: String,
    pub args: Vec<String>,
    pub workdir: Option<PathBuf>,
    pub status: PtyStatus,
    pub exit_code: Option<u32>,
    pub pid: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub line_count: usize,
    pub parent_session_id: Option<String>,
}

impl SessionInfo {
    pub fn command_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadResult {
    pub lines: Vec<String>,
    pub offset: usize,
    /// Lines currently retained
    pub total: usize,
    pub has_more: bool,
    pub status: PtyStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub matches: Vec<SearchMatch>,
    pub total_lines: usize,
    pub status: PtyStatus,
}

#[derive(Debug, Clone, Copy)]
struct Lifecycle {
    status: PtyStatus,
    exit_code: Option<u32>,
}

struct Session {
    id: String,
    title: String,
    command: String,
    args: Vec<String>,
    workdir: Option<PathBuf>,
    pid: Option<u32>,
    created_at: DateTime<Utc>,
    parent_session_id: Option<String>,
    lifecycle: Arc<Mutex<Lifecycle>>,
    buffer: Arc<Mutex<RingBuffer>>,
    writer: Box<dyn Write + Send>,
    killer: Box<dyn ChildKiller + Send + Sync>,
    // Dropping the master closes the terminal
    _master: Box<dyn MasterPty + Send>,
}

impl Session {
    fn lifecycle(&self) -> Lifecycle {
        *lock(&self.lifecycle)
    }

    fn info(&self) -> SessionInfo {
        let lifecycle = self.lifecycle();
        SessionInfo {
            id: self.id.clone(),
            title: self.title.clone(),
            command: self.command.clone(),
            args: self.args.clone(),
            workdir: self.workdir.clone(),
            status: lifecycle.status,
            exit_code: lifecycle.exit_code,
            pid: self.pid,
            created_at: self.created_at,
            line_count: lock(&self.buffer).len(),
            parent_session_id: self.parent_session_id.clone(),
        }
    }

    /// Terminate the child if it is still running
    fn terminate(&mut self) {
        let mut lifecycle = lock(&self.lifecycle);
        if lifecycle.status != PtyStatus::Running {
            return;
        }
        if let Err(e) = self.killer.kill() {
            debug!(id = %self.id, error = %e, "kill failed, process likely gone");
        }
        lifecycle.status = PtyStatus::Killed;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn new_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("pty_{}", &hex[..8])
}

/// Owns every PTY session of the process; all sessions die with it
pub struct PtyManager {
    sessions: Mutex<HashMap<String, Session>>,
    buffer_lines: usize,
}

impl PtyManager {
    pub fn new(buffer_lines: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            buffer_lines,
        }
    }

    pub fn spawn(&self, options: SpawnOptions) -> Result<SessionInfo, PtyError> {
        let spawn_error = |e: &dyn fmt::Display| PtyError::Spawn {
            command: options.command_line(),
            message: e.to_string(),
        };

        let pair = native_pty_system()
            .openpty(PtySize {
                rows: 24,
                cols: 120,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| spawn_error(&e))?;

        let mut builder = CommandBuilder::new(&options.command);
        builder.args(&options.args);
        let workdir = match &options.workdir {
            Some(dir) => Some(dir.clone()),
            None => std::env::current_dir().ok(),
        };
        if let Some(dir) = &workdir {
            builder.cwd(dir);
        }
        for (key, value) in &options.env {
            builder.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(builder)
            .map_err(|e| spawn_error(&e))?;
        // The child holds its own handle to the slave side
        drop(pair.slave);

        let killer = child.clone_killer();
        let pid = child.process_id();
        let reader = pair.master.try_clone_reader().map_err(|e| spawn_error(&e))?;
        let writer = pair.master.take_writer().map_err(|e| spawn_error(&e))?;

        let id = new_id();
        let buffer = Arc::new(Mutex::new(RingBuffer::new(self.buffer_lines)));
        let lifecycle = Arc::new(Mutex::new(Lifecycle {
            status: PtyStatus::Running,
            exit_code: None,
        }));

        spawn_reader(&id, reader, Arc::clone(&buffer))?;
        spawn_waiter(&id, child, Arc::clone(&lifecycle))?;

        let session = Session {
            title: options
                .title
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| options.command_line()),
            id: id.clone(),
            command: options.command,
            args: options.args,
            workdir,
            pid,
            created_at: Utc::now(),
            parent_session_id: options.parent_session_id,
            lifecycle,
            buffer,
            writer,
            killer,
            _master: pair.master,
        };
        let info = session.info();
        info!(id = %info.id, command = %info.command_line(), pid = ?pid, "PTY spawned");

        lock(&self.sessions).insert(id, session);
        Ok(info)
    }

    /// Send input after escape decoding; returns the number of bytes written
    pub fn write(&self, id: &str, data: &str) -> Result<usize, PtyError> {
        let mut sessions = lock(&self.sessions);
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| PtyError::NotFound(id.to_string()))?;

        let status = session.lifecycle().status;
        if status != PtyStatus::Running {
            return Err(PtyError::NotRunning {
                id: id.to_string(),
                status,
            });
        }

        let bytes = escape::decode(data);
        session.writer.write_all(&bytes)?;
        session.writer.flush()?;
        Ok(bytes.len())
    }

    pub fn read(&self, id: &str, offset: usize, limit: Option<usize>) -> Result<ReadResult, PtyError> {
        let sessions = lock(&self.sessions);
        let session = sessions
            .get(id)
            .ok_or_else(|| PtyError::NotFound(id.to_string()))?;

        let buffer = lock(&session.buffer);
        let lines = buffer.read(offset, limit);
        let total = buffer.len();
        Ok(ReadResult {
            has_more: offset + lines.len() < total,
            lines,
            offset,
            total,
            status: session.lifecycle().status,
        })
    }

    pub fn search(&self, id: &str, pattern: &str) -> Result<SearchResult, PtyError> {
        let regex = Regex::new(pattern)?;
        let sessions = lock(&self.sessions);
        let session = sessions
            .get(id)
            .ok_or_else(|| PtyError::NotFound(id.to_string()))?;

        let buffer = lock(&session.buffer);
        Ok(SearchResult {
            matches: buffer.search(&regex),
            total_lines: buffer.len(),
            status: session.lifecycle().status,
        })
    }

    /// Terminate a session; with `cleanup` it is also removed from the registry
    pub fn kill(&self, id: &str, cleanup: bool) -> Result<SessionInfo, PtyError> {
        let mut sessions = lock(&self.sessions);
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| PtyError::NotFound(id.to_string()))?;

        session.terminate();
        let info = session.info();
        if cleanup {
            sessions.remove(id);
        }
        info!(id, cleanup, "PTY killed");
        Ok(info)
    }

    /// All sessions, oldest first
    pub fn list(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = lock(&self.sessions).values().map(Session::info).collect();
        infos.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        infos
    }

    pub fn get(&self, id: &str) -> Option<SessionInfo> {
        lock(&self.sessions).get(id).map(Session::info)
    }

    /// Kill and remove every session owned by a conversation
    pub fn cleanup_by_session(&self, parent_session_id: &str) -> usize {
        let mut sessions = lock(&self.sessions);
        let ids: Vec<String> = sessions
            .values()
            .filter(|s| s.parent_session_id.as_deref() == Some(parent_session_id))
            .map(|s| s.id.clone())
            .collect();
        for id in &ids {
            if let Some(mut session) = sessions.remove(id) {
                session.terminate();
            }
        }
        if !ids.is_empty() {
            info!(parent = parent_session_id, count = ids.len(), "PTY sessions cleaned up");
        }
        ids.len()
    }

    /// Kill and remove every session
    pub fn cleanup_all(&self) -> usize {
        let mut sessions = lock(&self.sessions);
        let count = sessions.len();
        for (_, mut session) in sessions.drain() {
            session.terminate();
        }
        if count > 0 {
            info!(count, "all PTY sessions cleaned up");
        }
        count
    }

    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.sessions).is_empty()
    }
}

impl Default for PtyManager {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_LINES)
    }
}

impl Drop for PtyManager {
    fn drop(&mut self) {
        self.cleanup_all();
    }
}

fn spawn_reader(
    id: &str,
    mut reader: Box<dyn Read + Send>,
    buffer: Arc<Mutex<RingBuffer>>,
) -> Result<(), PtyError> {
    let thread_id = id.to_string();
    std::thread::Builder::new()
        .name(format!("{}-reader", id))
        .spawn(move || {
            let mut chunk = [0u8; 4096];
            let mut pending = Vec::new();
            loop {
                match reader.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        pending.extend_from_slice(&chunk[..n]);
                        let text = take_utf8(&mut pending);
                        lock(&buffer).push(&text);
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    // EIO once the child side closes
                    Err(_) => break,
                }
            }
            if !pending.is_empty() {
                lock(&buffer).push(&String::from_utf8_lossy(&pending));
            }
            debug!(id = %thread_id, "PTY reader finished");
        })?;
    Ok(())
}

/// Drain the decodable prefix of `bytes`, leaving an incomplete trailing
/// UTF-8 sequence for the next chunk
fn take_utf8(bytes: &mut Vec<u8>) -> String {
    let valid = match std::str::from_utf8(bytes) {
        Ok(_) => bytes.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => bytes.len(),
    };
    let rest = bytes.split_off(valid);
    let text = String::from_utf8_lossy(bytes).into_owned();
    *bytes = rest;
    text
}

fn spawn_waiter(
    id: &str,
    mut child: Box<dyn Child + Send + Sync>,
    lifecycle: Arc<Mutex<Lifecycle>>,
) -> Result<(), PtyError> {
    let thread_id = id.to_string();
    std::thread::Builder::new()
        .name(format!("{}-waiter", id))
        .spawn(move || {
            let code = match child.wait() {
                Ok(status) => Some(status.exit_code()),
                Err(e) => {
                    warn!(id = %thread_id, error = %e, "failed to wait on PTY child");
                    None
                }
            };
            let mut lifecycle = lock(&lifecycle);
            if lifecycle.status == PtyStatus::Running {
                lifecycle.status = PtyStatus::Exited;
            }
            lifecycle.exit_code = code;
            debug!(id = %thread_id, exit_code = ?code, "PTY child exited");
        })?;
    Ok(())
}
