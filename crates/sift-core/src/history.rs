//! History map: a numbered listing of every tool call, handed to the agent as
//! system context so it can address calls by stable index.

use crate::disposition::{Disposition, OverrideMap};
use crate::index::{ToolCallIndex, ToolCallInfo};
use serde_json::Value;

/// Longest parameter summary taken from a raw input serialization
pub const SUMMARY_LIMIT: usize = 60;

const OPEN_TAG: &str = "<history_map>";
const CLOSE_TAG: &str = "</history_map>";
const PREAMBLE: &str = "Tool calls so far, by ID. Pass IDs to `extract` (with a summary) or \
`discard` (with a reason) to drop outputs you no longer need.";

#[derive(Debug, Clone, Copy)]
enum Style {
    Plain,
    Quoted,
}

/// Input fields tried in order for the parameter summary
const SUMMARY_FIELDS: &[(&str, Style)] = &[
    ("filePath", Style::Plain),
    ("path", Style::Plain),
    ("pattern", Style::Quoted),
];

/// One line per call: `{index}. {name}({summary}){annotation}`
pub fn render_lines(index: &ToolCallIndex, overrides: &OverrideMap) -> Vec<String> {
    index
        .iter()
        .map(|call| {
            let annotation = overrides
                .get(&call.id)
                .map(|raw| format!(" {}", Disposition::parse(raw).label()))
                .unwrap_or_default();
            format!(
                "{}. {}({}){}",
                call.position,
                call.name,
                summarize(call),
                annotation
            )
        })
        .collect()
}

/// Full history-map block, or an empty string when the log has no tool calls
pub fn render(index: &ToolCallIndex, overrides: &OverrideMap) -> String {
    let lines = render_lines(index, overrides);
    if lines.is_empty() {
        return String::new();
    }
    format!("{}\n{}\n{}\n{}", OPEN_TAG, PREAMBLE, lines.join("\n"), CLOSE_TAG)
}

fn summarize(call: &ToolCallInfo) -> String {
    for (field, style) in SUMMARY_FIELDS {
        if let Some(value) = call.input.get(*field).and_then(Value::as_str) {
            if value.is_empty() {
                continue;
            }
            return match style {
                Style::Plain => value.to_string(),
                Style::Quoted => format!("\"{}\"", value),
            };
        }
    }

    if call.input.is_empty() {
        return String::new();
    }
    let raw = serde_json::to_string(&call.input).unwrap_or_default();
    truncate(&raw, SUMMARY_LIMIT)
}

/// Cut at a char boundary, marking the cut with an ellipsis
fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
