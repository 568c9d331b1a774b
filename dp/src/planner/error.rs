//! Planner error types

use thiserror::Error;

use super::parser::ParseFailure;
use crate::llm::LlmError;
use crate::state::StateError;

/// Errors from plan generation and reflection saving
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Completion failed: {0}")]
    Completion(#[from] LlmError),

    #[error("Failed to parse AI response: {0}")]
    Unparseable(#[from] ParseFailure),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error(transparent)]
    State(#[from] StateError),
}

impl PlannerError {
    pub fn prompt(e: eyre::Report) -> Self {
        PlannerError::Prompt(format!("{:#}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unparseable_names_parse_failure() {
        let err = PlannerError::from(ParseFailure {
            excerpt: "sorry".to_string(),
        });
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to parse AI response"));
        assert!(msg.contains("sorry"));
    }

    #[test]
    fn test_state_is_transparent() {
        let err = PlannerError::from(StateError::NotFound("Plan not found for date 2024-03-01".to_string()));
        assert_eq!(err.to_string(), "Record not found: Plan not found for date 2024-03-01");
    }
}
