//! Record types persisted by the store
//!
//! These are plain data carriers; all SQL lives in `store`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Task category, a fixed set of six life areas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Health,
    Business,
    Learning,
    Networking,
    Mindset,
    #[default]
    Personal,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Self::Health,
        Self::Business,
        Self::Learning,
        Self::Networking,
        Self::Mindset,
        Self::Personal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Business => "business",
            Self::Learning => "learning",
            Self::Networking => "networking",
            Self::Mindset => "mindset",
            Self::Personal => "personal",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "health" => Ok(Self::Health),
            "business" => Ok(Self::Business),
            "learning" => Ok(Self::Learning),
            "networking" => Ok(Self::Networking),
            "mindset" => Ok(Self::Mindset),
            "personal" => Ok(Self::Personal),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

/// Task priority: 1 = critical, 2 = important, 3 = useful
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    Critical,
    #[default]
    Important,
    Useful,
}

impl Priority {
    /// Numeric level as stored and as exchanged with the model
    pub fn level(&self) -> u8 {
        match self {
            Self::Critical => 1,
            Self::Important => 2,
            Self::Useful => 3,
        }
    }

    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            1 => Some(Self::Critical),
            2 => Some(Self::Important),
            3 => Some(Self::Useful),
            _ => None,
        }
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> u8 {
        p.level()
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::from_level(level as i64).ok_or_else(|| format!("Priority must be 1-3, got {}", level))
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Important => write!(f, "important"),
            Self::Useful => write!(f, "useful"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "critical" => Ok(Self::Critical),
            "2" | "important" => Ok(Self::Important),
            "3" | "useful" => Ok(Self::Useful),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

/// Where a task came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskOrigin {
    /// Produced by plan generation; replaced on every regeneration
    Ai,
    /// Entered by the user; survives regeneration
    Manual,
}

impl TaskOrigin {
    pub fn is_ai(&self) -> bool {
        matches!(self, Self::Ai)
    }
}

/// A daily plan, unique per date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: i64,
    pub date: NaiveDate,
    pub focus: String,
    /// 1-10
    pub energy_level: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task belonging to exactly one plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub plan_id: i64,
    pub category: Category,
    pub title: String,
    pub description: String,
    /// Free-form slot such as "07:00-07:30"
    pub time_slot: String,
    pub duration_min: u32,
    pub priority: Priority,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub origin: TaskOrigin,
    pub sort_order: i64,
}

/// Fields for inserting a task
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub category: Category,
    pub title: String,
    pub description: String,
    pub time_slot: String,
    pub duration_min: u32,
    pub priority: Priority,
}

impl NewTask {
    /// Task with default category, priority and a 30 minute duration
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            category: Category::default(),
            title: title.into(),
            description: String::new(),
            time_slot: String::new(),
            duration_min: 30,
            priority: Priority::default(),
        }
    }
}

/// A generated task together with its display position
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedTask {
    pub position: i64,
    pub task: NewTask,
}

/// A plan with its ordered tasks and completion percentage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanView {
    #[serde(flatten)]
    pub plan: Plan,
    pub tasks: Vec<Task>,
    /// 0-100
    pub progress: u8,
}

/// Rounded percentage of `done` over `total`; 0 when there is nothing to do
pub fn completion_percent(done: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    ((done as f64 / total as f64) * 100.0).round() as u8
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: i64,
    pub category: String,
    pub title: String,
    pub description: String,
    pub target_date: Option<NaiveDate>,
    /// 0-100
    pub progress: u8,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewGoal {
    pub category: String,
    pub title: String,
    pub description: String,
    pub target_date: Option<NaiveDate>,
}

/// Partial goal update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub progress: Option<u8>,
    pub is_active: Option<bool>,
}

impl GoalUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.progress.is_none() && self.is_active.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: i64,
    pub title: String,
    pub category: String,
    pub frequency: String,
    pub streak: u32,
    pub best_streak: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewHabit {
    pub title: String,
    pub category: String,
    pub frequency: String,
}

/// End-of-day review, unique per date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub date: NaiveDate,
    pub wins: String,
    pub lessons: String,
    /// 1-10
    pub mood: u8,
    /// 0-5
    pub rating: u8,
    pub notes: String,
    pub ai_summary: String,
    pub ai_next_day: String,
    /// 0-100
    pub day_score: u8,
    pub updated_at: DateTime<Utc>,
}

impl Reflection {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            wins: String::new(),
            lessons: String::new(),
            mood: 5,
            rating: 0,
            notes: String::new(),
            ai_summary: String::new(),
            ai_next_day: String::new(),
            day_score: 0,
            updated_at: Utc::now(),
        }
    }
}

/// The part of a reflection folded into the next day's prompt
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionDigest {
    pub mood: u8,
    pub lessons: String,
}

/// How a previous day went
#[derive(Debug, Clone, PartialEq)]
pub struct DayOutcome {
    pub date: NaiveDate,
    pub done: u32,
    pub total: u32,
    pub reflection: Option<ReflectionDigest>,
}

/// Snapshot of user state read before generating a plan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationContext {
    pub goal_titles: Vec<String>,
    pub habit_titles: Vec<String>,
    /// Present only when the previous date has a plan
    pub yesterday: Option<DayOutcome>,
}

/// Aggregate counters across all records
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stats {
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub completion_rate: u8,
    pub total_plans: u32,
    pub active_goals: u32,
    pub active_habits: u32,
    pub avg_mood: Option<f64>,
    pub avg_rating: Option<f64>,
    /// Consecutive days ending today whose plan has a completed task
    pub current_streak: u32,
}
