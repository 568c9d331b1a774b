//! CLI command definitions and subcommands

use chrono::{Duration, Local, NaiveDate};
use clap::{Parser, Subcommand};
use daystore::{Category, Priority};
use std::path::PathBuf;
use tracing::debug;

/// Day Planner - AI-assisted daily plans
#[derive(Parser)]
#[command(
    name = "dp",
    about = "AI-assisted daily plan generation with goals, habits and reflections",
    version = env!("CARGO_PKG_VERSION"),
    after_help = after_help()
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate and inspect daily plans
    Plan {
        #[command(subcommand)]
        command: PlanCommand,
    },

    /// Manage tasks inside a plan
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },

    /// Manage goals
    Goal {
        #[command(subcommand)]
        command: GoalCommand,
    },

    /// Manage habits
    Habit {
        #[command(subcommand)]
        command: HabitCommand,
    },

    /// Save an end-of-day reflection (with AI analysis when configured)
    Reflect(ReflectArgs),

    /// Inspect saved reflections
    Reflection {
        #[command(subcommand)]
        command: ReflectionCommand,
    },

    /// Show overall statistics
    Stats,
}

/// Plan subcommands
#[derive(Debug, Subcommand)]
pub enum PlanCommand {
    /// Generate (or regenerate) the plan for a date
    Generate {
        /// Date (YYYY-MM-DD, today, tomorrow, yesterday)
        #[arg(short, long, default_value = "today", value_parser = parse_date)]
        date: NaiveDate,

        /// Focus of the day
        #[arg(long, default_value = "", value_parser = parse_focus)]
        focus: String,

        /// Energy level 1-10
        #[arg(short, long, default_value_t = 7, value_parser = clap::value_parser!(u8).range(1..=10))]
        energy: u8,
    },

    /// Show the plan for a date
    Show {
        #[arg(default_value = "today", value_parser = parse_date)]
        date: NaiveDate,
    },

    /// List recent plans
    List {
        #[arg(short = 'n', long, default_value_t = 30)]
        limit: u32,
    },

    /// Delete the plan for a date and all of its tasks
    Rm {
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
    },
}

/// Task subcommands
#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    /// Add a manual task to an existing plan
    Add {
        #[arg(value_parser = parse_date)]
        date: NaiveDate,

        #[arg(short, long, value_parser = parse_title)]
        title: String,

        #[arg(long, default_value = "personal")]
        category: Category,

        #[arg(short, long, default_value = "", value_parser = parse_description)]
        description: String,

        /// Time slot, e.g. 09:00-10:30
        #[arg(short = 's', long, default_value = "", value_parser = parse_time_slot)]
        time_slot: String,

        /// Duration in minutes (1-480)
        #[arg(short = 'm', long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=480))]
        duration: u32,

        /// Priority: 1=critical, 2=important, 3=useful
        #[arg(short, long, default_value = "2")]
        priority: Priority,
    },

    /// Mark a task done
    Done {
        id: i64,

        /// Clear the completion instead
        #[arg(long)]
        undo: bool,
    },

    /// Delete a task
    Rm { id: i64 },
}

/// Goal subcommands
#[derive(Debug, Subcommand)]
pub enum GoalCommand {
    /// Create a goal
    Add {
        #[arg(value_parser = parse_title)]
        title: String,

        #[arg(long, default_value = "personal")]
        category: Category,

        #[arg(short, long, default_value = "", value_parser = parse_description)]
        description: String,

        #[arg(short, long, value_parser = parse_date)]
        target_date: Option<NaiveDate>,
    },

    /// List goals
    List {
        /// Include inactive goals
        #[arg(short, long)]
        all: bool,
    },

    /// Update a goal
    Update {
        id: i64,

        #[arg(long, value_parser = parse_title)]
        title: Option<String>,

        #[arg(long, value_parser = parse_description)]
        description: Option<String>,

        /// Progress 0-100
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        progress: Option<u8>,

        #[arg(long)]
        active: Option<bool>,
    },

    /// Delete a goal
    Rm { id: i64 },
}

/// Habit subcommands
#[derive(Debug, Subcommand)]
pub enum HabitCommand {
    /// Create a habit
    Add {
        #[arg(value_parser = parse_title)]
        title: String,

        #[arg(long, default_value = "personal")]
        category: Category,

        #[arg(long, default_value = "daily")]
        frequency: String,
    },

    /// List habits
    List {
        /// Include inactive habits
        #[arg(short, long)]
        all: bool,
    },

    /// Log a habit for a date
    Log {
        id: i64,

        #[arg(short, long, default_value = "today", value_parser = parse_date)]
        date: NaiveDate,

        /// Record the day as missed (resets the streak)
        #[arg(long)]
        missed: bool,
    },

    /// Delete a habit
    Rm { id: i64 },
}

/// Reflection subcommands
#[derive(Debug, Subcommand)]
pub enum ReflectionCommand {
    /// Show the reflection for a date
    Show {
        #[arg(default_value = "today", value_parser = parse_date)]
        date: NaiveDate,
    },
}

/// Arguments for `dp reflect`
#[derive(Debug, clap::Args)]
pub struct ReflectArgs {
    #[arg(short, long, default_value = "today", value_parser = parse_date)]
    pub date: NaiveDate,

    /// What went well
    #[arg(short, long, default_value = "", value_parser = parse_review_text)]
    pub wins: String,

    /// What to improve
    #[arg(short = 'L', long, default_value = "", value_parser = parse_review_text)]
    pub lessons: String,

    /// Mood 1-10
    #[arg(short, long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub mood: u8,

    /// Day rating 0-5
    #[arg(short, long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=5))]
    pub rating: u8,

    #[arg(long, default_value_t = 0)]
    pub rituals_done: u32,

    #[arg(long, default_value_t = 0)]
    pub rituals_total: u32,

    #[arg(long, default_value_t = 0.0)]
    pub deepwork_hours: f64,

    #[arg(long, default_value_t = 0)]
    pub calories: u32,

    /// Overall score 0-100
    #[arg(short, long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub score: u8,

    #[arg(short, long, default_value = "")]
    pub notes: String,
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dayplanner")
        .join("logs")
        .join("dayplanner.log")
}

fn after_help() -> String {
    format!("Logs are written to: {}", get_log_path().display())
}

/// Parse YYYY-MM-DD or one of today/tomorrow/yesterday
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    let today = Local::now().date_naive();
    match s.trim().to_lowercase().as_str() {
        "today" => Ok(today),
        "tomorrow" => Ok(today + Duration::days(1)),
        "yesterday" => Ok(today - Duration::days(1)),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
            .map_err(|_| format!("Invalid date '{}': expected YYYY-MM-DD", s)),
    }
}

fn bounded(s: &str, what: &str, min: usize, max: usize) -> Result<String, String> {
    let len = s.chars().count();
    if len < min || len > max {
        return Err(format!("{} must be {}-{} characters, got {}", what, min, max, len));
    }
    Ok(s.to_string())
}

fn parse_title(s: &str) -> Result<String, String> {
    bounded(s.trim(), "title", 1, 500)
}

fn parse_focus(s: &str) -> Result<String, String> {
    bounded(s, "focus", 0, crate::planner::MAX_FOCUS_CHARS)
}

fn parse_description(s: &str) -> Result<String, String> {
    bounded(s, "description", 0, 2000)
}

fn parse_time_slot(s: &str) -> Result<String, String> {
    bounded(s.trim(), "time slot", 0, 20)
}

fn parse_review_text(s: &str) -> Result<String, String> {
    bounded(s, "text", 0, crate::planner::MAX_REVIEW_TEXT_CHARS)
}

/// Output format for all commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}
