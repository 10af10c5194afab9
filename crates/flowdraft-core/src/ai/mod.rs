pub mod claude;
pub mod ollama;
pub mod openai;

pub use claude::ClaudeClient;
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;

use async_trait::async_trait;

use crate::config::Config;
use crate::conversation::ChatMessage;
use crate::error::GenerationError;
use crate::provider::Provider;

/// Everything a provider needs for one completion
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError>;
}

/// The configured provider's client
#[derive(Clone)]
pub enum AiClient {
    OpenAI(OpenAIClient),
    Claude(ClaudeClient),
    Ollama(OllamaClient),
}

impl AiClient {
    /// Build the client for `provider`, reading its key from the environment
    /// first and the config file second.
    pub fn from_config(provider: Provider, config: &Config) -> Result<Self, GenerationError> {
        match provider {
            Provider::OpenAI => {
                let key = config
                    .api_key(provider)
                    .ok_or(GenerationError::MissingApiKey(provider.display_name()))?;
                Ok(AiClient::OpenAI(OpenAIClient::with_base_url(&key, config.openai_base_url())))
            }
            Provider::Claude => {
                let key = config
                    .api_key(provider)
                    .ok_or(GenerationError::MissingApiKey(provider.display_name()))?;
                Ok(AiClient::Claude(ClaudeClient::new(&key)))
            }
            Provider::Ollama => Ok(AiClient::Ollama(OllamaClient::new(config.ollama_base_url()))),
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            AiClient::OpenAI(_) => Provider::OpenAI,
            AiClient::Claude(_) => Provider::Claude,
            AiClient::Ollama(_) => Provider::Ollama,
        }
    }
}

#[async_trait]
impl CompletionClient for AiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        match self {
            AiClient::OpenAI(client) => client.complete(request).await,
            AiClient::Claude(client) => client.complete(request).await,
            AiClient::Ollama(client) => client.complete(request).await,
        }
    }
}

/// Map a non-success response to a `GenerationError`, keeping the body for the user
pub(crate) async fn check_status(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, GenerationError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(GenerationError::Http { provider, status, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_needs_no_key() {
        let config = Config::new();
        let client = AiClient::from_config(Provider::Ollama, &config);
        assert!(matches!(client, Ok(AiClient::Ollama(_))));
    }

    #[test]
    fn test_claude_key_from_config() {
        let mut config = Config::new();
        config.claude_api_key = Some("sk-test".to_string());
        // Environment may also provide one; either way a client is built
        let client = AiClient::from_config(Provider::Claude, &config).unwrap();
        assert_eq!(client.provider(), Provider::Claude);
    }
}
