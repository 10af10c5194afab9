use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{check_status, CompletionClient, CompletionRequest};
use crate::conversation::ChatMessage;
use crate::error::GenerationError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Deserialize)]
struct OllamaChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaChatMessage>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Deserialize)]
struct OllamaModelsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn list_models(&self) -> Result<Vec<String>, GenerationError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().await?;
        let response = check_status("Ollama", response).await?;

        let models_response: OllamaModelsResponse = response.json().await?;
        Ok(models_response
            .models
            .into_iter()
            .map(|model| model.name)
            .collect())
    }
}

#[async_trait]
impl CompletionClient for OllamaClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = OllamaChatRequest {
            model: &request.model,
            messages: &request.messages,
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        debug!(model = %request.model, messages = request.messages.len(), "ollama chat request");

        let response = self.client.post(&url).json(&body).send().await?;
        let response = check_status("Ollama", response).await?;

        let ollama_response: OllamaChatResponse = response.json().await?;
        ollama_response
            .message
            .map(|m| m.content)
            .filter(|c| !c.is_empty())
            .ok_or(GenerationError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::{get, post}, Json, Router};
    use serde_json::{json, Value};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_chat_maps_options() {
        let app = Router::new().route(
            "/api/chat",
            post(|Json(body): Json<Value>| async move {
                let echoed = format!(
                    "{}|{}|{}",
                    body["options"]["num_predict"], body["stream"], body["messages"][0]["role"]
                );
                Json(json!({ "message": { "role": "assistant", "content": echoed }, "done": true }))
            }),
        );
        let base = serve(app).await;

        let client = OllamaClient::new(&base);
        let request = CompletionRequest {
            model: "llama3.2:latest".to_string(),
            messages: vec![ChatMessage::system("sys")],
            temperature: 0.1,
            max_tokens: 256,
        };
        let text = client.complete(&request).await.unwrap();
        assert_eq!(text, "256|false|\"system\"");
    }

    #[tokio::test]
    async fn test_list_models() {
        let app = Router::new().route(
            "/api/tags",
            get(|| async { Json(json!({ "models": [{ "name": "llama3.2:latest" }, { "name": "qwen2.5" }] })) }),
        );
        let base = serve(app).await;

        let models = OllamaClient::new(&base).list_models().await.unwrap();
        assert_eq!(models, vec!["llama3.2:latest", "qwen2.5"]);
    }
}
