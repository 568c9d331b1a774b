//! Plan generation and reflection analysis
//!
//! The pipeline for one generation request:
//!
//! 1. [`composer`] renders the prompt from goals, habits and yesterday's outcome
//! 2. one completion call through [`crate::llm::LlmClient`]
//! 3. [`parser`] extracts the JSON object from the model's text
//! 4. [`draft`] reads it field by field with defaults
//! 5. [`reconciler`] writes the plan and replaces its AI tasks atomically

pub mod composer;
pub mod draft;
mod error;
mod generator;
pub mod parser;
pub mod reconciler;
mod reflection;

pub use composer::{ComposedPrompt, PlanPromptInput, compose_plan_prompt, yesterday_summary};
pub use draft::{PlanDraft, TaskDraft};
pub use error::PlannerError;
pub use generator::{CallSettings, DayPlanner, GenerationRequest, MAX_FOCUS_CHARS};
pub use parser::{Extraction, ExtractionStage, ParseFailure, extract_json};
pub use reconciler::{GenerationOutcome, positioned_tasks};
pub use reflection::{
    ANALYSIS_UNAVAILABLE, DayAnalysis, DayReview, MAX_REVIEW_TEXT_CHARS, ReflectionOutcome, compose_reflection_prompt,
};
