//! Tool output blocks for PTY operations

use crate::manager::{ReadResult, SearchResult, SessionInfo};

pub fn spawned(info: &SessionInfo) -> String {
    let mut out = vec!["<pty_spawned>".to_string()];
    out.push(format!("ID: {}", info.id));
    out.push(format!("Title: {}", info.title));
    out.push(format!("Command: {}", info.command_line()));
    if let Some(dir) = &info.workdir {
        out.push(format!("Workdir: {}", dir.display()));
    }
    if let Some(pid) = info.pid {
        out.push(format!("PID: {}", pid));
    }
    out.push(format!("Status: {}", info.status));
    out.push("</pty_spawned>".to_string());
    out.join("\n")
}

pub fn list(sessions: &[SessionInfo]) -> String {
    if sessions.is_empty() {
        return "<pty_list>\nNo active PTY sessions.\n</pty_list>".to_string();
    }

    let mut out = vec!["<pty_list>".to_string()];
    for info in sessions {
        out.push(format!("[{}] {}", info.id, info.title));
        out.push(format!("  Command: {}", info.command_line()));
        let status = match info.exit_code {
            Some(code) => format!("{} (exit code {})", info.status, code),
            None => info.status.to_string(),
        };
        out.push(format!("  Status: {}", status));
        out.push(format!(
            "  PID: {}",
            info.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string())
        ));
        out.push(format!("  Lines: {}", info.line_count));
        out.push(String::new());
    }
    out.push(format!("Total: {} session(s)", sessions.len()));
    out.push("</pty_list>".to_string());
    out.join("\n")
}

/// Buffered lines, numbered from 1 across the retained window
pub fn output(id: &str, result: &ReadResult) -> String {
    let mut out = vec![format!("<pty_output id=\"{}\" status=\"{}\">", id, result.status)];
    if result.lines.is_empty() {
        out.push("(no output)".to_string());
    }
    for (i, line) in result.lines.iter().enumerate() {
        out.push(format!("{:05}| {}", result.offset + i + 1, line));
    }
    out.push(String::new());
    let end = result.offset + result.lines.len();
    if result.has_more {
        out.push(format!(
            "(Showing lines {}-{} of {}. Use offset={} to read more.)",
            result.offset + 1,
            end,
            result.total,
            end
        ));
    } else {
        out.push(format!("(End of buffer - total {} lines)", result.total));
    }
    out.push("</pty_output>".to_string());
    out.join("\n")
}

pub fn search(id: &str, pattern: &str, result: &SearchResult) -> String {
    let mut out = vec![format!(
        "<pty_output id=\"{}\" status=\"{}\" pattern=\"{}\">",
        id, result.status, pattern
    )];
    if result.matches.is_empty() {
        out.push(format!("No lines matching /{}/", pattern));
    }
    for found in &result.matches {
        out.push(format!("{:05}| {}", found.line_number, found.text));
    }
    out.push(String::new());
    out.push(format!(
        "({} match(es) in {} lines)",
        result.matches.len(),
        result.total_lines
    ));
    out.push("</pty_output>".to_string());
    out.join("\n")
}

pub fn killed(info: &SessionInfo, cleanup: bool) -> String {
    let mut out = vec!["<pty_killed>".to_string()];
    out.push(format!("Killed: {}", info.id));
    out.push(format!("Title: {}", info.title));
    out.push(format!("Command: {}", info.command_line()));
    out.push(format!("Final line count: {}", info.line_count));
    out.push(if cleanup {
        "Session removed and buffer discarded.".to_string()
    } else {
        "Session retained; output can still be read.".to_string()
    });
    out.push("</pty_killed>".to_string());
    out.join("\n")
}

pub fn written(id: &str, bytes: usize) -> String {
    format!("Sent {} bytes to {}", bytes, id)
}
