use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{check_status, CompletionClient, CompletionRequest};
use crate::conversation::ChatRole;
use crate::error::GenerationError;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

#[derive(Serialize, Debug, PartialEq)]
struct ClaudeMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize, Debug)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ClaudeMessage<'a>>,
}

#[derive(Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Clone)]
pub struct ClaudeClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ClaudeClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// The messages API takes system text as a separate field
fn build_request(request: &CompletionRequest) -> ClaudeRequest<'_> {
    let system: Vec<&str> = request
        .messages
        .iter()
        .filter(|m| m.role == ChatRole::System)
        .map(|m| m.content.as_str())
        .collect();

    let messages = request
        .messages
        .iter()
        .filter_map(|m| match m.role {
            ChatRole::System => None,
            ChatRole::User => Some(ClaudeMessage { role: "user", content: &m.content }),
            ChatRole::Assistant => Some(ClaudeMessage { role: "assistant", content: &m.content }),
        })
        .collect();

    ClaudeRequest {
        model: &request.model,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        system: if system.is_empty() { None } else { Some(system.join("\n\n")) },
        messages,
    }
}

#[async_trait]
impl CompletionClient for ClaudeClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        let url = format!("{}/messages", self.base_url);
        let body = build_request(request);

        debug!(model = %request.model, messages = body.messages.len(), "claude completion request");

        let response = self.client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;
        let response = check_status("Claude", response).await?;

        let claude_response: ClaudeResponse = response.json().await?;
        let text: String = claude_response.content.into_iter().map(|c| c.text).collect();
        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text)
    }
}
