//! End-of-day reflection with optional AI analysis
//!
//! The reflection is saved whatever happens to the analysis call; a failed
//! analysis only changes what ends up in the AI fields.

use chrono::NaiveDate;
use daystore::Reflection;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::composer::ComposedPrompt;
use super::error::PlannerError;
use super::generator::DayPlanner;
use super::parser::{Extraction, extract_json};
use crate::llm::LlmError;
use crate::prompts::PromptLoader;

/// Stored as the summary when the analysis call or its parsing failed
pub const ANALYSIS_UNAVAILABLE: &str = "Анализ временно недоступен";

/// Longest accepted wins/lessons text, in characters
pub const MAX_REVIEW_TEXT_CHARS: usize = 2000;

/// The user's review of one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayReview {
    pub date: NaiveDate,
    pub wins: String,
    pub lessons: String,
    /// 1-10
    pub mood: u8,
    /// 0-5
    pub rating: u8,
    pub rituals_done: u32,
    pub rituals_total: u32,
    pub deepwork_hours: f64,
    pub calories: u32,
    /// 0-100
    pub overall_score: u8,
    pub notes: String,
}

impl DayReview {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            wins: String::new(),
            lessons: String::new(),
            mood: 5,
            rating: 0,
            rituals_done: 0,
            rituals_total: 0,
            deepwork_hours: 0.0,
            calories: 0,
            overall_score: 0,
            notes: String::new(),
        }
    }

    pub fn validate(&self) -> Result<(), PlannerError> {
        let invalid = |msg: String| -> Result<(), PlannerError> { Err(PlannerError::InvalidRequest(msg)) };
        if !(1..=10).contains(&self.mood) {
            return invalid(format!("mood must be 1-10, got {}", self.mood));
        }
        if self.rating > 5 {
            return invalid(format!("rating must be 0-5, got {}", self.rating));
        }
        if self.overall_score > 100 {
            return invalid(format!("overall score must be 0-100, got {}", self.overall_score));
        }
        if !self.deepwork_hours.is_finite() || self.deepwork_hours < 0.0 {
            return invalid(format!("deep work hours must be non-negative, got {}", self.deepwork_hours));
        }
        for (name, text) in [("wins", &self.wins), ("lessons", &self.lessons)] {
            if text.chars().count() > MAX_REVIEW_TEXT_CHARS {
                return invalid(format!("{} must be at most {} characters", name, MAX_REVIEW_TEXT_CHARS));
            }
        }
        Ok(())
    }

    fn has_content(&self) -> bool {
        !self.wins.trim().is_empty() || !self.lessons.trim().is_empty()
    }
}

/// AI fields written with the reflection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayAnalysis {
    pub ai_summary: String,
    pub ai_next_day: String,
    pub day_score: u8,
}

impl DayAnalysis {
    fn empty(overall_score: u8) -> Self {
        Self {
            ai_summary: String::new(),
            ai_next_day: String::new(),
            day_score: overall_score,
        }
    }

    fn unavailable(overall_score: u8) -> Self {
        Self {
            ai_summary: ANALYSIS_UNAVAILABLE.to_string(),
            ..Self::empty(overall_score)
        }
    }

    /// Read `summary`, `next_day` and `score` from the model's object
    pub fn from_value(value: &Value, overall_score: u8) -> Self {
        let ai_summary = value
            .get("summary")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        let ai_next_day = value
            .get("next_day")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| match item {
                        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                        Value::String(_) | Value::Null => None,
                        other => Some(other.to_string()),
                    })
                    .map(|item| format!("• {}", item))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        let day_score = value
            .get("score")
            .and_then(|s| s.as_f64())
            .filter(|s| s.is_finite())
            .map(|s| s.round().clamp(0.0, 100.0) as u8)
            .unwrap_or(overall_score);

        Self {
            ai_summary,
            ai_next_day,
            day_score,
        }
    }
}

/// What saving a reflection returns to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReflectionOutcome {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub analysis: DayAnalysis,
}

#[derive(Serialize)]
struct ReflectionTemplateContext<'a> {
    rating: u8,
    rituals_done: u32,
    rituals_total: u32,
    deepwork_hours: f64,
    calories: u32,
    overall_score: u8,
    wins: &'a str,
    lessons: &'a str,
    mood: u8,
}

/// Render the reflection analysis prompt
pub fn compose_reflection_prompt(loader: &PromptLoader, review: &DayReview) -> eyre::Result<ComposedPrompt> {
    debug!(date = %review.date, "compose_reflection_prompt: called");
    let context = ReflectionTemplateContext {
        rating: review.rating,
        rituals_done: review.rituals_done,
        rituals_total: review.rituals_total,
        deepwork_hours: review.deepwork_hours,
        calories: review.calories,
        overall_score: review.overall_score,
        wins: &review.wins,
        lessons: &review.lessons,
        mood: review.mood,
    };

    Ok(ComposedPrompt {
        system: loader.render("reflection-system", &serde_json::json!({}))?,
        user: loader.render("reflection", &context)?,
    })
}

impl DayPlanner {
    /// Analyze the day (when possible) and save the reflection
    pub async fn save_reflection(&self, review: DayReview) -> Result<ReflectionOutcome, PlannerError> {
        debug!(date = %review.date, "save_reflection: called");
        review.validate()?;

        let analysis = self.analyze_day(&review).await;
        let reflection = Reflection {
            date: review.date,
            wins: review.wins,
            lessons: review.lessons,
            mood: review.mood,
            rating: review.rating,
            notes: review.notes,
            ai_summary: analysis.ai_summary.clone(),
            ai_next_day: analysis.ai_next_day.clone(),
            day_score: analysis.day_score,
            updated_at: daystore::now(),
        };
        self.state.upsert_reflection(reflection).await?;

        info!(date = %review.date, day_score = %analysis.day_score, "Saved reflection");
        Ok(ReflectionOutcome {
            date: review.date,
            analysis,
        })
    }

    /// Run the analysis call; never fails, degrades instead
    async fn analyze_day(&self, review: &DayReview) -> DayAnalysis {
        debug!(date = %review.date, "analyze_day: called");
        if !self.llm.is_configured() {
            debug!("analyze_day: no API key, skipping analysis");
            return DayAnalysis::empty(review.overall_score);
        }
        if !review.has_content() {
            debug!("analyze_day: no wins or lessons, skipping analysis");
            return DayAnalysis::empty(review.overall_score);
        }

        let prompt = match compose_reflection_prompt(&self.prompts, review) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "analyze_day: failed to compose prompt");
                return DayAnalysis::unavailable(review.overall_score);
            }
        };

        let response = match self
            .llm
            .complete(self.analysis_call.request(prompt.system, prompt.user))
            .await
        {
            Ok(response) => response,
            Err(LlmError::ApiError { status, .. }) => {
                warn!(%status, "AI API returned status {}", status);
                return DayAnalysis::empty(review.overall_score);
            }
            Err(e) => {
                warn!(error = %e, "AI API request failed");
                return DayAnalysis::unavailable(review.overall_score);
            }
        };

        match extract_json(response.content.as_deref().unwrap_or_default()) {
            Extraction::Parsed { value, .. } => DayAnalysis::from_value(&value, review.overall_score),
            Extraction::Failed(failure) => {
                warn!(excerpt = %failure.excerpt, "Failed to parse AI response");
                DayAnalysis::unavailable(review.overall_score)
            }
        }
    }
}
