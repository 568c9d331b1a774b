//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during a completion call
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// The HTTP status for provider-side errors
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::ApiError { status, .. } => Some(*status),
            LlmError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the request never produced an HTTP response
    pub fn is_transport(&self) -> bool {
        match self {
            LlmError::Network(e) => e.status().is_none(),
            LlmError::Timeout(_) => true,
            _ => false,
        }
    }

    /// True when a response arrived but its body could not be used
    pub fn is_malformed(&self) -> bool {
        matches!(self, LlmError::InvalidResponse(_) | LlmError::Json(_))
    }
}
