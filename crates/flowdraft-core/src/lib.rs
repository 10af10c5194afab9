pub mod ai;
pub mod config;
pub mod conversation;
pub mod error;
pub mod provider;
pub mod render;
pub mod sanitize;
pub mod session;

// Re-export main types for convenience
pub use ai::{AiClient, ClaudeClient, CompletionClient, CompletionRequest, OllamaClient, OpenAIClient};
pub use config::Config;
pub use conversation::{ChatMessage, ChatRole, Conversation};
pub use error::{GenerationError, RenderError};
pub use provider::Provider;
pub use render::{DiagramRenderer, FlowchartRenderer, RenderOptions, RenderedDiagram, Theme};
pub use sanitize::sanitize;
pub use session::{GenerationSettings, PendingGeneration, RequestStatus, Session};
