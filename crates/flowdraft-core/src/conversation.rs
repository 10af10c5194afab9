//! Conversation history sent to the completion endpoint
//!
//! The history is append-only and always starts with one system message.
//! Appending returns a new `Conversation` so a failed generation can simply
//! drop the candidate and keep the old one.

use serde::{Deserialize, Serialize};

/// Instructions seeded as the first message of every session
pub const SYSTEM_PROMPT: &str = "You are a flowchart generator. Respond only with Mermaid flowchart code \
that starts with `flowchart TD`. Do not wrap the code in markdown fences and do not add any \
explanation. When you are given existing flowchart code, modify it according to the user's \
request and return the complete updated code.";

/// Prefix of the synthetic context message carrying the current diagram
pub const CURRENT_DIAGRAM_PREFIX: &str = "Current flowchart code (modify this):";

/// A chat message in the AI conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(SYSTEM_PROMPT)
    }
}

impl Conversation {
    pub fn new(system_prompt: &str) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages after the system prompt, for display
    pub fn turns(&self) -> &[ChatMessage] {
        &self.messages[1..]
    }

    pub fn append_user(&self, text: &str) -> Conversation {
        self.append(ChatMessage::user(text))
    }

    pub fn append_assistant(&self, text: &str) -> Conversation {
        self.append(ChatMessage::assistant(text))
    }

    fn append(&self, message: ChatMessage) -> Conversation {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.extend_from_slice(&self.messages);
        messages.push(message);
        Conversation { messages }
    }
}

/// Build the outbound message list for one generation.
///
/// When a diagram already exists it is sent back as an assistant message right
/// before the new request so the model edits it instead of starting over. That
/// message only exists in the request; `history` is not modified.
pub fn build_request_messages(
    history: &Conversation,
    current_source: &str,
    new_user_text: &str,
) -> Vec<ChatMessage> {
    let mut messages = history.messages().to_vec();

    if !current_source.trim().is_empty() {
        messages.push(ChatMessage::assistant(format!(
            "{}\n{}",
            CURRENT_DIAGRAM_PREFIX, current_source
        )));
    }

    messages.push(ChatMessage::user(new_user_text));
    messages
}
