//! Chat completion request/response types

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A completion request - everything needed for one model call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System-role instruction
    pub system_prompt: String,

    /// Conversation turns after the system prompt (one user turn for our call sites)
    pub messages: Vec<Message>,

    /// Max tokens for the response
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Upper bound on the whole HTTP exchange
    pub timeout: Duration,
}

impl CompletionRequest {
    /// A single-turn request: system prompt plus one user message
    pub fn single_turn(
        system_prompt: impl Into<String>,
        user: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        debug!(%max_tokens, ?timeout, "CompletionRequest::single_turn: called");
        Self {
            system_prompt: system_prompt.into(),
            messages: vec![Message::user(user)],
            max_tokens,
            temperature,
            timeout,
        }
    }

    /// Text of the first user message, if any
    pub fn user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Response from a completion call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionResponse {
    /// Text of the first choice; `None` when the provider sent no content
    pub content: Option<String>,

    /// Provider finish reason ("stop", "length", ...)
    pub finish_reason: Option<String>,

    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Response carrying only text, as a provider would return for a plain answer
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            finish_reason: Some("stop".to_string()),
            usage: TokenUsage::default(),
        }
    }
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
