//! Day Planner - AI-assisted daily plan generation
//!
//! Generates a day's plan from the user's goals, habits and how yesterday
//! went, by asking a chat-completion model for a JSON plan and writing it
//! into the [`daystore`] database.
//!
//! # Core Concepts
//!
//! - **One plan per date**: regenerating replaces the AI tasks of that date
//! - **Manual tasks survive**: tasks the user added are never touched by regeneration
//! - **All or nothing**: a failed model call or unparseable answer leaves stored state unchanged
//! - **Degrade, don't fail**: reflection analysis falls back to an empty or placeholder summary
//!
//! # Modules
//!
//! - [`llm`] - Completion client trait and OpenAI-compatible implementation
//! - [`prompts`] - Prompt templates
//! - [`planner`] - Generation pipeline and reflection analysis
//! - [`state`] - Actor serializing access to the store
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod llm;
pub mod planner;
pub mod prompts;
pub mod state;

// Re-export commonly used types
pub use config::{Config, LlmConfig};
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, OpenAIClient, create_client};
pub use planner::{
    DayPlanner, DayReview, Extraction, GenerationOutcome, GenerationRequest, PlannerError, ReflectionOutcome,
    extract_json,
};
pub use prompts::PromptLoader;
pub use state::{StateCommand, StateError, StateManager, StateResponse};
