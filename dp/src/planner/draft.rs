//! Generation result schema
//!
//! The model's JSON is read field by field: any field that is missing or has
//! the wrong shape falls back to a default instead of failing the whole
//! response.

use daystore::{Category, NewTask, Priority};
use serde_json::Value;
use tracing::debug;

/// Default task length when the model gives none (or nonsense)
pub const DEFAULT_DURATION_MIN: u32 = 30;

/// Longest duration accepted from the model
const MAX_DURATION_MIN: u32 = 24 * 60;

/// A parsed generation response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanDraft {
    pub big_three: Vec<String>,
    /// In the order the model listed them, including unusable entries
    pub tasks: Vec<TaskDraft>,
    pub daily_tip: String,
    pub evening_routine: String,
}

impl PlanDraft {
    pub fn from_value(value: &Value) -> Self {
        debug!("PlanDraft::from_value: called");
        let big_three = value
            .get("big_three")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(non_empty_str).collect())
            .unwrap_or_default();

        let tasks = value
            .get("tasks")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(TaskDraft::from_value).collect())
            .unwrap_or_default();

        Self {
            big_three,
            tasks,
            daily_tip: string_field(value, "daily_tip"),
            evening_routine: string_field(value, "evening_routine"),
        }
    }
}

/// One task as proposed by the model; every field optional
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub category: Option<Category>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_slot: Option<String>,
    pub duration_min: Option<u32>,
    pub priority: Option<Priority>,
}

impl TaskDraft {
    /// Read a draft from one element of the `tasks` array
    ///
    /// Non-object elements become an empty draft, which has no title.
    pub fn from_value(value: &Value) -> Self {
        Self {
            category: value.get("category").and_then(parse_category),
            title: value.get("title").and_then(non_empty_str),
            description: value.get("description").and_then(Value::as_str).map(str::to_string),
            time_slot: value.get("time_slot").and_then(Value::as_str).map(|s| s.trim().to_string()),
            duration_min: value.get("duration_min").and_then(parse_duration),
            priority: value.get("priority").and_then(parse_priority),
        }
    }

    /// Convert to an insertable task, `None` when the draft has no title
    pub fn to_new_task(&self) -> Option<NewTask> {
        let title = self.title.clone()?;
        Some(NewTask {
            category: self.category.unwrap_or_default(),
            title,
            description: self.description.clone().unwrap_or_default(),
            time_slot: self.time_slot.clone().unwrap_or_default(),
            duration_min: self.duration_min.unwrap_or(DEFAULT_DURATION_MIN),
            priority: self.priority.unwrap_or_default(),
        })
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Category names, tolerating case and decoration such as a leading emoji
fn parse_category(value: &Value) -> Option<Category> {
    let raw = value.as_str()?;
    raw.trim_matches(|c: char| !c.is_alphabetic()).parse().ok()
}

fn parse_duration(value: &Value) -> Option<u32> {
    let minutes = match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f.round() as u64))?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u32::try_from(minutes)
        .ok()
        .filter(|m| (1..=MAX_DURATION_MIN).contains(m))
}

fn parse_priority(value: &Value) -> Option<Priority> {
    match value {
        Value::Number(n) => n.as_i64().and_then(Priority::from_level),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
