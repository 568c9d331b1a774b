//! Store - the SQLite connection and every operation on it
//!
//! Operations are grouped by record type in submodules. Every public
//! operation opens one transaction and commits it before returning, so a
//! failing statement rolls back everything the operation did.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use rusqlite::types::Type;
use tracing::{debug, info};

use crate::error::{DbContext, Result, StoreError};
use crate::records::{Category, Plan, Priority, Task, TaskOrigin};
use crate::schema;

mod goals;
mod plans;
mod reflections;

pub use plans::AppliedPlan;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Handle to the planner database
pub struct Store {
    connection: Connection,
}

impl Store {
    /// Open (or create) the database file, creating parent directories as needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Store::open: called");

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let connection = Connection::open(path).db_context("Failed to open database connection")?;
        schema::initialize(&connection)?;

        info!(path = %path.display(), "Opened planner database");
        Ok(Self { connection })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        debug!("Store::open_in_memory: called");
        let connection = Connection::open_in_memory().db_context("Failed to open in-memory database")?;
        schema::initialize(&connection)?;
        Ok(Self { connection })
    }
}

pub(crate) fn date_to_sql(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn ts_to_sql(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

fn conversion_error(idx: usize, err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

pub(crate) fn date_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn opt_date_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub(crate) fn ts_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

pub(crate) fn opt_ts_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

/// Columns: id, date, focus, energy_level, created_at, updated_at
pub(crate) fn plan_from_row(row: &rusqlite::Row) -> rusqlite::Result<Plan> {
    Ok(Plan {
        id: row.get(0)?,
        date: date_column(row, 1)?,
        focus: row.get(2)?,
        energy_level: row.get(3)?,
        created_at: ts_column(row, 4)?,
        updated_at: ts_column(row, 5)?,
    })
}

/// Columns: id, plan_id, category, title, description, time_slot,
/// duration_min, priority, is_completed, completed_at, is_ai_generated, sort_order
pub(crate) fn task_from_row(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    let category_str: String = row.get(2)?;
    let category = category_str.parse::<Category>().map_err(|e| conversion_error(2, e))?;

    let level: i64 = row.get(7)?;
    let priority =
        Priority::from_level(level).ok_or_else(|| conversion_error(7, format!("Invalid priority: {}", level)))?;

    let is_ai: bool = row.get(10)?;

    Ok(Task {
        id: row.get(0)?,
        plan_id: row.get(1)?,
        category,
        title: row.get(3)?,
        description: row.get(4)?,
        time_slot: row.get(5)?,
        duration_min: row.get(6)?,
        priority,
        is_completed: row.get(8)?,
        completed_at: opt_ts_column(row, 9)?,
        origin: if is_ai { TaskOrigin::Ai } else { TaskOrigin::Manual },
        sort_order: row.get(11)?,
    })
}
