//! Fixed-capacity line buffer

use regex::Regex;
use serde::Serialize;
use std::collections::VecDeque;

pub const DEFAULT_BUFFER_LINES: usize = 10_000;

/// A line matched by [`RingBuffer::search`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    /// 1-based, relative to the retained window
    pub line_number: usize,
    pub text: String,
}

/// Output lines, oldest first. Never holds more than `capacity` lines.
///
/// Raw terminal output arrives through [`RingBuffer::push`]; an unterminated
/// last line (a prompt, say) is kept visible and grows until its newline.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    lines: VecDeque<String>,
    capacity: usize,
    /// The last line is still waiting for its newline
    open_tail: bool,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            open_tail: false,
        }
    }

    /// Split `data` into lines and append them, evicting the oldest on overflow.
    /// A single trailing newline does not produce an empty line.
    pub fn append(&mut self, data: &str) {
        if data.is_empty() {
            return;
        }
        self.open_tail = false;
        self.push_lines(data);
    }

    /// Append a raw output chunk. Text after the last newline continues the
    /// open tail line on the next push.
    pub fn push(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        let mut data = String::new();
        if self.open_tail {
            if let Some(tail) = self.lines.pop_back() {
                data.push_str(&tail);
            }
        }
        data.push_str(chunk);
        self.open_tail = !data.ends_with('\n');
        self.push_lines(&data);
    }

    fn push_lines(&mut self, data: &str) {
        let data = data.strip_suffix('\n').unwrap_or(data);
        for line in data.split('\n') {
            if self.lines.len() == self.capacity {
                self.lines.pop_front();
            }
            self.lines.push_back(line.trim_end_matches('\r').to_string());
        }
    }

    /// Lines from `offset`, at most `limit` of them
    pub fn read(&self, offset: usize, limit: Option<usize>) -> Vec<String> {
        let take = limit.unwrap_or(usize::MAX);
        self.lines.iter().skip(offset).take(take).cloned().collect()
    }

    pub fn search(&self, pattern: &Regex) -> Vec<SearchMatch> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| pattern.is_match(line))
            .map(|(i, line)| SearchMatch {
                line_number: i + 1,
                text: line.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.open_tail = false;
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_LINES)
    }
}
