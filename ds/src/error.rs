//! Store error types

use chrono::NaiveDate;
use thiserror::Error;

/// Errors returned by [`crate::Store`] operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {message}: {source}")]
    Database {
        message: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Plan not found for date {0}")]
    PlanNotFound(NaiveDate),

    #[error("Task {0} not found")]
    TaskNotFound(i64),

    #[error("Goal {0} not found")]
    GoalNotFound(i64),

    #[error("Habit {0} not found")]
    HabitNotFound(i64),

    #[error("Failed to create database directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// True for the not-found variants
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PlanNotFound(_) | Self::TaskNotFound(_) | Self::GoalNotFound(_) | Self::HabitNotFound(_)
        )
    }
}

/// Result alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Attach a message to a rusqlite error
pub trait DbContext<T> {
    fn db_context(self, message: &str) -> Result<T>;
}

impl<T> DbContext<T> for std::result::Result<T, rusqlite::Error> {
    fn db_context(self, message: &str) -> Result<T> {
        self.map_err(|source| StoreError::Database {
            message: message.to_string(),
            source,
        })
    }
}
