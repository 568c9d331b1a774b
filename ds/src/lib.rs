//! DayStore - SQLite persistence for the day planner
//!
//! Owns the relational schema and every statement run against it. Each public
//! operation on [`Store`] runs inside a single SQLite transaction: either all
//! of its statements commit or none do.
//!
//! # Record types
//!
//! - [`Plan`] / [`Task`] - one plan per calendar date with an ordered task list
//! - [`Goal`] / [`Habit`] - user-owned context read by plan generation
//! - [`Reflection`] - one end-of-day review per date
//!
//! Tasks carry a [`TaskOrigin`]: AI-generated tasks are replaced wholesale on
//! regeneration, manual tasks are never touched by it.

mod error;
mod records;
mod schema;
mod store;

pub use error::{DbContext, Result, StoreError};
pub use records::{
    Category, DayOutcome, GenerationContext, Goal, GoalUpdate, Habit, NewGoal, NewHabit, NewTask, Plan, PlanView,
    PositionedTask, Priority, Reflection, ReflectionDigest, Stats, Task, TaskOrigin, completion_percent,
};
pub use store::{AppliedPlan, Store};

use chrono::{DateTime, Utc};

/// Current time as stored in timestamp columns
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
