//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent
///
/// Implementations issue exactly one provider request per call; there is no
/// retry and no conversation state between calls.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request and wait for the full response
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Whether credentials are configured
    ///
    /// A client without credentials is still usable; the provider will
    /// reject its calls.
    fn is_configured(&self) -> bool {
        true
    }
}
