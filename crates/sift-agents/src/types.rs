//! Wire types of the host session API

use serde::{Deserialize, Serialize};

/// Provider/model pair a session runs with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    #[serde(rename = "providerID")]
    pub provider_id: String,
    #[serde(rename = "modelID")]
    pub model_id: String,
}

/// Entry of `GET /session/status`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Busy,
    Retry,
    #[serde(other)]
    Unknown,
}

impl SessionStatus {
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionStatus::Idle)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HostMessageInfo {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, rename = "providerID")]
    pub provider_id: Option<String>,
    #[serde(default, rename = "modelID")]
    pub model_id: Option<String>,
    #[serde(default)]
    pub model: Option<ModelRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HostPart {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Entry of `GET /session/{id}/message`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HostMessage {
    #[serde(default)]
    pub info: HostMessageInfo,
    #[serde(default)]
    pub parts: Vec<HostPart>,
}

impl HostMessage {
    pub fn is_assistant(&self) -> bool {
        self.info.role.as_deref() == Some("assistant")
    }

    /// Non-empty text parts joined by newlines
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .parts
            .iter()
            .filter(|p| p.kind == "text")
            .filter_map(|p| p.text.as_deref())
            .filter(|t| !t.is_empty())
            .collect();
        (!texts.is_empty()).then(|| texts.join("\n"))
    }
}

/// Model of the last message: an assistant's own ids, or a user's requested model
pub fn inherited_model(messages: &[HostMessage]) -> Option<ModelRef> {
    let info = &messages.last()?.info;
    match info.role.as_deref() {
        Some("assistant") => Some(ModelRef {
            provider_id: info.provider_id.clone()?,
            model_id: info.model_id.clone()?,
        }),
        Some("user") => info.model.clone(),
        _ => None,
    }
}

/// Text of the last assistant message
pub fn final_text(messages: &[HostMessage]) -> Option<String> {
    messages.iter().rev().find(|m| m.is_assistant())?.text()
}

#[derive(Debug, Clone, Serialize)]
pub struct TextInput {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// Body of `POST /session/{id}/prompt_async`
#[derive(Debug, Clone, Serialize)]
pub struct PromptRequest {
    pub parts: Vec<TextInput>,
    pub agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelRef>,
}

impl PromptRequest {
    pub fn new(agent: &str, prompt: &str, model: Option<ModelRef>) -> Self {
        Self {
            parts: vec![TextInput {
                kind: "text",
                text: prompt.to_string(),
            }],
            agent: agent.to_string(),
            model,
        }
    }
}
