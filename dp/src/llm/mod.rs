//! LLM client module
//!
//! Provides single-shot chat completion requests against an
//! OpenAI-compatible provider.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod openai;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, TokenUsage};

use crate::config::LlmConfig;

/// Create the completion client described by config
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(model = %config.model, base_url = %config.base_url, "create_client: called");
    Ok(Arc::new(OpenAIClient::from_config(config)?))
}
