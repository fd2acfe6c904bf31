//! Generation service trait for chat-completion models.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The author of a [`ChatMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => f.write_str("system"),
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// A role-tagged text segment of a chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// A user-role message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    /// A system-role message.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }
}

/// Default sampling temperature: moderate, favouring a consistent tone.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Sampling settings forwarded to a chat-completion backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// The model identifier, e.g. `gpt-4o-mini`.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Optional cap on generated tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into(), temperature: DEFAULT_TEMPERATURE, max_tokens: None }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A chat-completion model: ordered messages in, generated text out.
///
/// No retries happen behind this interface; transient failures surface as
/// [`RagError::GenerationProviderError`](crate::RagError::GenerationProviderError).
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Complete the conversation and return the generated text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// A short name used in logs and error messages.
    fn name(&self) -> &str;
}
