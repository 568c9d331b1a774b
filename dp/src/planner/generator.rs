//! Plan generation service
//!
//! One request runs: read context → compose prompt → one completion call →
//! parse → reconcile. The context read and the result write are separate
//! store commands; nothing is held open while the model call is in flight.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, warn};

use super::composer::{PlanPromptInput, compose_plan_prompt, yesterday_summary};
use super::draft::PlanDraft;
use super::error::PlannerError;
use super::parser::{Extraction, extract_json};
use super::reconciler::{GenerationOutcome, reconcile};
use crate::config::LlmConfig;
use crate::llm::{CompletionRequest, LlmClient};
use crate::prompts::PromptLoader;
use crate::state::StateManager;

/// Longest accepted focus statement, in characters
pub const MAX_FOCUS_CHARS: usize = 500;

/// Energy level used when the request gives none
pub const DEFAULT_ENERGY: u8 = 7;

/// A plan generation request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub date: NaiveDate,
    pub focus: String,
    /// 1-10
    pub energy_level: u8,
}

impl GenerationRequest {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            focus: String::new(),
            energy_level: DEFAULT_ENERGY,
        }
    }

    pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
        self.focus = focus.into();
        self
    }

    pub fn with_energy(mut self, energy_level: u8) -> Self {
        self.energy_level = energy_level;
        self
    }

    pub fn validate(&self) -> Result<(), PlannerError> {
        if !(1..=10).contains(&self.energy_level) {
            return Err(PlannerError::InvalidRequest(format!(
                "energy level must be 1-10, got {}",
                self.energy_level
            )));
        }
        let focus_chars = self.focus.chars().count();
        if focus_chars > MAX_FOCUS_CHARS {
            return Err(PlannerError::InvalidRequest(format!(
                "focus must be at most {} characters, got {}",
                MAX_FOCUS_CHARS, focus_chars
            )));
        }
        Ok(())
    }
}

/// Per-call model parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallSettings {
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl CallSettings {
    pub fn plan(config: &LlmConfig) -> Self {
        Self {
            max_tokens: config.plan_max_tokens,
            temperature: config.temperature,
            timeout: config.plan_timeout(),
        }
    }

    pub fn analysis(config: &LlmConfig) -> Self {
        Self {
            max_tokens: config.analysis_max_tokens,
            temperature: config.temperature,
            timeout: config.analysis_timeout(),
        }
    }

    pub(crate) fn request(&self, system: String, user: String) -> CompletionRequest {
        CompletionRequest::single_turn(system, user, self.max_tokens, self.temperature, self.timeout)
    }
}

/// The planning service: plan generation and reflection analysis
#[derive(Clone)]
pub struct DayPlanner {
    pub(crate) state: StateManager,
    pub(crate) llm: Arc<dyn LlmClient>,
    pub(crate) prompts: Arc<PromptLoader>,
    pub(crate) plan_call: CallSettings,
    pub(crate) analysis_call: CallSettings,
}

impl DayPlanner {
    pub fn new(state: StateManager, llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, config: &LlmConfig) -> Self {
        debug!(model = %config.model, "DayPlanner::new: called");
        Self {
            state,
            llm,
            prompts,
            plan_call: CallSettings::plan(config),
            analysis_call: CallSettings::analysis(config),
        }
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Generate (or regenerate) the plan for a date
    ///
    /// On any failure before the final write, stored plans and tasks are
    /// left exactly as they were.
    pub async fn generate_plan(&self, request: GenerationRequest) -> Result<GenerationOutcome, PlannerError> {
        debug!(date = %request.date, energy = %request.energy_level, "generate_plan: called");
        request.validate()?;

        let context = self.state.generation_context(request.date).await?;
        let summary = yesterday_summary(context.yesterday.as_ref());
        let input = PlanPromptInput {
            date: request.date,
            weekday: request.date.weekday().num_days_from_monday(),
            focus: &request.focus,
            energy_level: request.energy_level,
            goal_titles: &context.goal_titles,
            habit_titles: &context.habit_titles,
            yesterday_summary: &summary,
        };
        let prompt = compose_plan_prompt(&self.prompts, &input).map_err(PlannerError::prompt)?;

        if !self.llm.is_configured() {
            warn!("generate_plan: no API key configured, the provider will likely reject the call");
        }
        let response = self
            .llm
            .complete(self.plan_call.request(prompt.system, prompt.user))
            .await?;
        let content = response.content.unwrap_or_default();

        let value = match extract_json(&content) {
            Extraction::Parsed { value, stage } => {
                debug!(?stage, "generate_plan: response parsed");
                value
            }
            Extraction::Failed(failure) => {
                warn!(excerpt = %failure.excerpt, "generate_plan: unparseable response");
                return Err(PlannerError::Unparseable(failure));
            }
        };

        let draft = PlanDraft::from_value(&value);
        let outcome = reconcile(&self.state, request.date, &request.focus, request.energy_level, draft).await?;

        info!(date = %outcome.date, plan_id = %outcome.plan_id, tasks = %outcome.tasks_created, "Generated plan");
        Ok(outcome)
    }
}
