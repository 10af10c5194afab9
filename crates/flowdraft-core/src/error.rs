//! Error types surfaced to the user.
//!
//! Both kinds are recoverable: the session keeps running and shows the
//! message beside the prompt.

use thiserror::Error;

/// Failure while asking a provider for diagram code
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{provider} API error {status}: {body}")]
    Http {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{0} API key not configured")]
    MissingApiKey(&'static str),

    #[error("completion response contained no text")]
    EmptyResponse,

    #[error("generation task failed: {0}")]
    Task(String),
}

/// Diagram text the renderer could not draw
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("diagram has no content")]
    Empty,

    #[error("unsupported diagram type `{0}`, expected a flowchart")]
    UnsupportedDiagram(String),

    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },
}

impl RenderError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        RenderError::Syntax {
            line,
            message: message.into(),
        }
    }
}
