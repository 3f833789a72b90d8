//! Event log model shared with the host

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message author role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
    /// Any role the host emits that the pruner does not reason about
    Other(String),
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => Role::Other(value),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::User => "user".to_string(),
            Role::Assistant => "assistant".to_string(),
            Role::Other(other) => other,
        }
    }
}

/// Message metadata (`info` block). Unknown host fields are carried through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageInfo {
    pub role: Role,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of the event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub info: MessageInfo,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self {
            info: MessageInfo {
                role,
                extra: Map::new(),
            },
            parts,
            extra: Map::new(),
        }
    }

    pub fn user(parts: Vec<Part>) -> Self {
        Self::new(Role::User, parts)
    }

    pub fn assistant(parts: Vec<Part>) -> Self {
        Self::new(Role::Assistant, parts)
    }

    /// User message carrying a single text part
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user(vec![Part::text(text)])
    }

    pub fn role(&self) -> &Role {
        &self.info.role
    }

    /// A user message opens a new turn when it carries text or is empty
    pub fn starts_turn(&self) -> bool {
        self.info.role == Role::User
            && (self.parts.is_empty() || self.parts.iter().any(|p| matches!(p, Part::Text(_))))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPart {
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Tool invocation requested by the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUse {
    pub tool_use_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolUse {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("unknown")
    }
}

/// Tool result payload: a plain string or structured blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolContent {
    Text(String),
    Blocks(Vec<Value>),
}

impl ToolContent {
    /// Flatten to text, joining the `text` of text blocks
    pub fn as_text(&self) -> String {
        match self {
            ToolContent::Text(text) => text.clone(),
            ToolContent::Blocks(blocks) => blocks
                .iter()
                .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_use_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ToolContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolResult {
    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }
}

/// A message part. Parts of unknown type, or known types whose shape does not
/// match, are kept verbatim as `Other`.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(TextPart),
    ToolUse(ToolUse),
    ToolResult(ToolResult),
    Other(Value),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(TextPart {
            text: text.into(),
            extra: Map::new(),
        })
    }

    /// Tool invocation; a non-object `input` is stored as an empty object
    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        let input = match input {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Part::ToolUse(ToolUse {
            tool_use_id: id.into(),
            name: Some(name.into()),
            input: Some(input),
            extra: Map::new(),
        })
    }

    pub fn tool_result(id: impl Into<String>, content: impl Into<String>, is_error: bool) -> Self {
        Part::ToolResult(ToolResult {
            tool_use_id: id.into(),
            content: Some(ToolContent::Text(content.into())),
            is_error: Some(is_error),
            extra: Map::new(),
        })
    }

    /// Short tag for the part kind, used in shape comparisons
    pub fn kind(&self) -> &str {
        match self {
            Part::Text(_) => "text",
            Part::ToolUse(_) => "tool_use",
            Part::ToolResult(_) => "tool_result",
            Part::Other(value) => value.get("type").and_then(Value::as_str).unwrap_or("other"),
        }
    }

    /// Call identifier for tool parts
    pub fn call_id(&self) -> Option<&str> {
        match self {
            Part::ToolUse(t) => Some(&t.tool_use_id),
            Part::ToolResult(r) => Some(&r.tool_use_id),
            _ => None,
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TaggedRef<'a> {
    Text(&'a TextPart),
    ToolUse(&'a ToolUse),
    ToolResult(&'a ToolResult),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Tagged {
    Text(TextPart),
    ToolUse(ToolUse),
    ToolResult(ToolResult),
}

impl Serialize for Part {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Part::Text(p) => TaggedRef::Text(p).serialize(serializer),
            Part::ToolUse(p) => TaggedRef::ToolUse(p).serialize(serializer),
            Part::ToolResult(p) => TaggedRef::ToolResult(p).serialize(serializer),
            Part::Other(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Part {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let part = match Tagged::deserialize(&value) {
            Ok(Tagged::Text(p)) => Part::Text(p),
            Ok(Tagged::ToolUse(p)) => Part::ToolUse(p),
            Ok(Tagged::ToolResult(p)) => Part::ToolResult(p),
            Err(_) => Part::Other(value),
        };
        Ok(part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_host_message() {
        let raw = json!({
            "info": {"role": "assistant", "id": "msg_1", "modelID": "m"},
            "parts": [
                {"type": "text", "text": "looking"},
                {"type": "tool_use", "tool_use_id": "c1", "name": "read", "input": {"path": "/a.ts"}},
            ]
        });
        let msg: Message = serde_json::from_value(raw).unwrap();
        assert_eq!(msg.role(), &Role::Assistant);
        assert_eq!(msg.info.extra.get("id"), Some(&json!("msg_1")));
        assert_eq!(msg.parts.len(), 2);
        match &msg.parts[1] {
            Part::ToolUse(t) => {
                assert_eq!(t.tool_use_id, "c1");
                assert_eq!(t.name(), "read");
            }
            other => panic!("expected tool_use, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_parts_pass_through() {
        let raw = json!({
            "info": {"role": "assistant"},
            "parts": [
                {"type": "reasoning", "text": "hmm", "time": {"start": 1}},
                {"type": "tool_use", "name": "read"}
            ]
        });
        let msg: Message = serde_json::from_value(raw.clone()).unwrap();
        assert!(matches!(msg.parts[0], Part::Other(_)));
        // tool_use without an id is not a usable invocation
        assert!(matches!(msg.parts[1], Part::Other(_)));
        assert_eq!(serde_json::to_value(&msg).unwrap(), raw);
    }

    #[test]
    fn test_non_object_parts_pass_through() {
        let raw = json!({
            "info": {"role": "user"},
            "parts": ["stray string part", 7, {"type": "text", "text": "hi"}]
        });
        let msg: Message = serde_json::from_value(raw.clone()).unwrap();
        assert!(matches!(msg.parts[0], Part::Other(_)));
        assert!(matches!(msg.parts[1], Part::Other(_)));
        assert!(matches!(msg.parts[2], Part::Text(_)));
        assert_eq!(serde_json::to_value(&msg).unwrap(), raw);
    }

    #[test]
    fn test_serialize_keeps_shape() {
        let raw = json!({
            "info": {"role": "user", "sessionID": "s1"},
            "parts": [
                {"type": "tool_result", "tool_use_id": "c1", "content": [{"type": "text", "text": "ok"}], "is_error": false, "cached": true}
            ]
        });
        let msg: Message = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&msg).unwrap(), raw);
    }

    #[test]
    fn test_other_role_round_trips() {
        let raw = json!({"info": {"role": "system"}, "parts": []});
        let msg: Message = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(msg.role(), &Role::Other("system".to_string()));
        assert!(!msg.starts_turn());
        assert_eq!(serde_json::to_value(&msg).unwrap(), raw);
    }

    #[test]
    fn test_starts_turn() {
        assert!(Message::user_text("hi").starts_turn());
        assert!(Message::user(vec![]).starts_turn());
        assert!(!Message::user(vec![Part::tool_result("c1", "x", false)]).starts_turn());
        assert!(!Message::assistant(vec![Part::text("x")]).starts_turn());
    }

    #[test]
    fn test_tool_content_as_text() {
        let blocks = ToolContent::Blocks(vec![
            json!({"type": "text", "text": "a"}),
            json!({"type": "image", "data": "..."}),
            json!({"type": "text", "text": "b"}),
        ]);
        assert_eq!(blocks.as_text(), "a\nb");
        assert_eq!(ToolContent::Text("x".into()).as_text(), "x");
    }
}
