//! Host session API client

use crate::error::HostError;
use crate::types::{HostMessage, PromptRequest, SessionStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// The slice of the host's session API the spawn/wait subsystem needs
#[async_trait]
pub trait HostClient: Send + Sync {
    async fn messages(&self, session_id: &str) -> Result<Vec<HostMessage>, HostError>;

    /// Create a child session; returns its id
    async fn create_session(&self, parent_id: &str, title: &str) -> Result<String, HostError>;

    /// Start a turn without waiting for it to finish
    async fn prompt_async(&self, session_id: &str, request: &PromptRequest) -> Result<(), HostError>;

    /// Status of every session the host knows about
    async fn statuses(&self) -> Result<HashMap<String, SessionStatus>, HostError>;

    async fn delete_session(&self, session_id: &str) -> Result<(), HostError>;
}

#[derive(Serialize)]
struct CreateSession<'a> {
    #[serde(rename = "parentID")]
    parent_id: &'a str,
    title: &'a str,
}

#[derive(Deserialize)]
struct CreatedSession {
    #[serde(default)]
    id: Option<String>,
}

/// `HostClient` over the host's HTTP server
#[derive(Debug, Clone)]
pub struct HttpHostClient {
    client: reqwest::Client,
    base_url: String,
    directory: Option<String>,
}

impl HttpHostClient {
    pub fn new(base_url: &str, directory: Option<String>) -> Result<Self, HostError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            directory,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn scoped(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.directory {
            Some(dir) => builder.query(&[("directory", dir)]),
            None => builder,
        }
    }

    async fn send(
        &self,
        endpoint: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, HostError> {
        let response = self.scoped(builder).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HostError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl HostClient for HttpHostClient {
    async fn messages(&self, session_id: &str) -> Result<Vec<HostMessage>, HostError> {
        let path = format!("/session/{}/message", session_id);
        let response = self.send(&path, self.client.get(self.url(&path))).await?;
        Ok(response.json().await?)
    }

    async fn create_session(&self, parent_id: &str, title: &str) -> Result<String, HostError> {
        let builder = self
            .client
            .post(self.url("/session"))
            .json(&CreateSession { parent_id, title });
        let created: CreatedSession = self.send("/session", builder).await?.json().await?;
        created
            .id
            .filter(|id| !id.is_empty())
            .ok_or(HostError::MissingSessionId)
    }

    async fn prompt_async(&self, session_id: &str, request: &PromptRequest) -> Result<(), HostError> {
        let path = format!("/session/{}/prompt_async", session_id);
        self.send(&path, self.client.post(self.url(&path)).json(request))
            .await?;
        Ok(())
    }

    async fn statuses(&self) -> Result<HashMap<String, SessionStatus>, HostError> {
        let path = "/session/status";
        let response = self.send(path, self.client.get(self.url(path))).await?;
        Ok(response.json().await?)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), HostError> {
        let path = format!("/session/{}", session_id);
        self.send(&path, self.client.delete(self.url(&path))).await?;
        Ok(())
    }
}
