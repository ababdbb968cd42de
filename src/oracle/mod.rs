//! External prediction service (language model).
//!
//! The rest of the crate sees the model as two calls, [`Oracle::embed`] and
//! [`Oracle::chat`]. Neither is retried: a failure surfaces to the caller.

pub mod embedder;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod openai;

pub use embedder::CachedEmbedder;
pub use error::{EmbedError, OracleError, OracleResult};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockOracle;
pub use openai::{OpenAiConfig, OpenAiOracle};

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message of a chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Canonical text of a chat request, used as the CHAT cache key content.
///
/// Each message is rendered as `<role> (<byte length>):` followed by its
/// content, so no two different conversations render the same.
pub fn render_messages(messages: &[ChatMessage]) -> String {
    let mut rendered = String::new();
    for message in messages {
        rendered.push_str(message.role.as_str());
        rendered.push_str(&format!(" ({}):\n", message.content.len()));
        rendered.push_str(&message.content);
        rendered.push('\n');
    }
    rendered
}

/// Embedding and chat endpoints of a language model.
#[async_trait]
pub trait Oracle: Send + Sync + fmt::Debug {
    /// Embeds `text` into a fixed-length vector.
    async fn embed(&self, text: &str) -> OracleResult<Vec<f32>>;

    /// Answers a chat conversation with the assistant's text.
    async fn chat(&self, messages: &[ChatMessage]) -> OracleResult<String>;

    /// Chat model identifier.
    fn model(&self) -> &str;

    /// Embedding model identifier.
    fn embedding_model(&self) -> &str;

    /// Sampling seed sent with every request.
    fn seed(&self) -> u32;

    /// Requests the backend tolerates in parallel.
    fn max_concurrency(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_is_stable_and_role_aware() {
        let a = [ChatMessage::system("rules"), ChatMessage::user("question")];
        let b = [ChatMessage::user("rules"), ChatMessage::user("question")];

        assert_eq!(render_messages(&a), render_messages(&a.clone()));
        assert_ne!(render_messages(&a), render_messages(&b));
        assert_eq!(
            render_messages(&a),
            "system (5):\nrules\nuser (8):\nquestion\n"
        );
    }

    #[test]
    fn test_render_is_unambiguous() {
        let joined = [ChatMessage::user("a\nuser (1):\nb")];
        let split = [ChatMessage::user("a"), ChatMessage::user("b")];
        assert_ne!(render_messages(&joined), render_messages(&split));
    }

    #[test]
    fn test_role_wire_names() {
        let json = serde_json::to_value(ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, serde_json::json!({ "role": "assistant", "content": "hi" }));
    }
}
