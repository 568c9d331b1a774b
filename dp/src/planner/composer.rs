//! Prompt composition
//!
//! Turns a generation input into the system and user instructions sent to the
//! model. Rendering is a pure function of the input and the loaded templates.

use chrono::{Datelike, NaiveDate};
use daystore::{DayOutcome, completion_percent};
use eyre::Result;
use serde::Serialize;
use tracing::debug;

use crate::prompts::PromptLoader;

/// Weekday names, Monday first
pub const WEEKDAYS_RU: [&str; 7] = [
    "Понедельник",
    "Вторник",
    "Среда",
    "Четверг",
    "Пятница",
    "Суббота",
    "Воскресенье",
];

/// Focus used in the prompt when the request gives none
pub const DEFAULT_FOCUS: &str = "Общее развитие";

/// Placeholder for an empty goal or habit list
pub const NOT_SET: &str = "Не заданы";

/// Placeholder for a missing yesterday summary
pub const NO_DATA: &str = "Нет данных";

/// System and user instruction for one completion call
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPrompt {
    pub system: String,
    pub user: String,
}

/// Everything the plan prompt is rendered from
#[derive(Debug, Clone)]
pub struct PlanPromptInput<'a> {
    pub date: NaiveDate,
    /// 0 = Monday .. 6 = Sunday
    pub weekday: u32,
    pub focus: &'a str,
    pub energy_level: u8,
    pub goal_titles: &'a [String],
    pub habit_titles: &'a [String],
    pub yesterday_summary: &'a str,
}

impl<'a> PlanPromptInput<'a> {
    /// Input for `date`, with the weekday taken from the date itself
    pub fn for_date(date: NaiveDate, focus: &'a str, energy_level: u8) -> Self {
        Self {
            date,
            weekday: date.weekday().num_days_from_monday(),
            focus,
            energy_level,
            goal_titles: &[],
            habit_titles: &[],
            yesterday_summary: "",
        }
    }
}

#[derive(Serialize)]
struct PlanTemplateContext<'a> {
    date: String,
    weekday: &'static str,
    focus: &'a str,
    energy: u8,
    goals: String,
    habits: String,
    yesterday_summary: &'a str,
}

/// Name for a weekday index, empty for out-of-range indexes
pub fn weekday_name(weekday: u32) -> &'static str {
    WEEKDAYS_RU.get(weekday as usize).copied().unwrap_or("")
}

fn join_or(titles: &[String], placeholder: &str) -> String {
    if titles.is_empty() {
        placeholder.to_string()
    } else {
        titles.join(", ")
    }
}

fn or_default<'a>(text: &'a str, default: &'a str) -> &'a str {
    if text.trim().is_empty() { default } else { text }
}

/// Render the plan generation prompt
pub fn compose_plan_prompt(loader: &PromptLoader, input: &PlanPromptInput<'_>) -> Result<ComposedPrompt> {
    debug!(date = %input.date, weekday = %input.weekday, energy = %input.energy_level, "compose_plan_prompt: called");
    let context = PlanTemplateContext {
        date: input.date.format("%Y-%m-%d").to_string(),
        weekday: weekday_name(input.weekday),
        focus: or_default(input.focus, DEFAULT_FOCUS),
        energy: input.energy_level,
        goals: join_or(input.goal_titles, NOT_SET),
        habits: join_or(input.habit_titles, NOT_SET),
        yesterday_summary: or_default(input.yesterday_summary, NO_DATA),
    };

    Ok(ComposedPrompt {
        system: loader.render("plan-system", &serde_json::json!({}))?,
        user: loader.render("plan", &context)?,
    })
}

/// One-line summary of the previous day, empty when there was no plan
pub fn yesterday_summary(outcome: Option<&DayOutcome>) -> String {
    let Some(day) = outcome else {
        return String::new();
    };

    let mut summary = format!(
        "Выполнено {}/{} задач ({}%)",
        day.done,
        day.total,
        completion_percent(day.done, day.total)
    );
    if let Some(reflection) = &day.reflection {
        summary.push_str(&format!(
            ". Настроение: {}/10. Уроки: {}",
            reflection.mood, reflection.lessons
        ));
    }
    summary
}
