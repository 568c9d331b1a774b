//! State manager messages
//!
//! Commands and responses for the actor pattern.

use chrono::NaiveDate;
use daystore::{
    AppliedPlan, GenerationContext, Goal, GoalUpdate, Habit, NewGoal, NewHabit, NewTask, PlanView, PositionedTask,
    Reflection, Stats, StoreError, Task,
};
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors from state operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Channel error")]
    ChannelError,
}

impl StateError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StateError::NotFound(_))
    }
}

impl From<StoreError> for StateError {
    fn from(e: StoreError) -> Self {
        if e.is_not_found() {
            StateError::NotFound(e.to_string())
        } else {
            StateError::StoreError(e.to_string())
        }
    }
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Commands sent to the StateManager actor
#[derive(Debug)]
pub enum StateCommand {
    // Plan operations
    GetPlan {
        date: NaiveDate,
        reply: oneshot::Sender<StateResponse<Option<PlanView>>>,
    },
    ListPlans {
        limit: u32,
        reply: oneshot::Sender<StateResponse<Vec<PlanView>>>,
    },
    ApplyGeneratedPlan {
        date: NaiveDate,
        focus: String,
        energy_level: u8,
        tasks: Vec<PositionedTask>,
        reply: oneshot::Sender<StateResponse<AppliedPlan>>,
    },
    DeletePlan {
        date: NaiveDate,
        reply: oneshot::Sender<StateResponse<()>>,
    },

    // Task operations
    AddManualTask {
        date: NaiveDate,
        task: NewTask,
        reply: oneshot::Sender<StateResponse<Task>>,
    },
    SetTaskCompleted {
        id: i64,
        completed: bool,
        reply: oneshot::Sender<StateResponse<Task>>,
    },
    DeleteTask {
        id: i64,
        reply: oneshot::Sender<StateResponse<()>>,
    },

    // Goal operations
    CreateGoal {
        goal: NewGoal,
        reply: oneshot::Sender<StateResponse<Goal>>,
    },
    ListGoals {
        active_only: bool,
        reply: oneshot::Sender<StateResponse<Vec<Goal>>>,
    },
    UpdateGoal {
        id: i64,
        update: GoalUpdate,
        reply: oneshot::Sender<StateResponse<Goal>>,
    },
    DeleteGoal {
        id: i64,
        reply: oneshot::Sender<StateResponse<()>>,
    },

    // Habit operations
    CreateHabit {
        habit: NewHabit,
        reply: oneshot::Sender<StateResponse<Habit>>,
    },
    ListHabits {
        active_only: bool,
        reply: oneshot::Sender<StateResponse<Vec<Habit>>>,
    },
    LogHabit {
        id: i64,
        date: NaiveDate,
        completed: bool,
        reply: oneshot::Sender<StateResponse<Habit>>,
    },
    DeleteHabit {
        id: i64,
        reply: oneshot::Sender<StateResponse<()>>,
    },

    // Reflection operations
    GetReflection {
        date: NaiveDate,
        reply: oneshot::Sender<StateResponse<Option<Reflection>>>,
    },
    UpsertReflection {
        reflection: Reflection,
        reply: oneshot::Sender<StateResponse<()>>,
    },

    // Read models
    GenerationContext {
        date: NaiveDate,
        reply: oneshot::Sender<StateResponse<GenerationContext>>,
    },
    Stats {
        today: NaiveDate,
        reply: oneshot::Sender<StateResponse<Stats>>,
    },

    // Control
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_mapping() {
        let not_found: StateError = StoreError::TaskNotFound(7).into();
        assert!(not_found.is_not_found());

        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let plan_missing: StateError = StoreError::PlanNotFound(date).into();
        assert!(plan_missing.to_string().contains("2024-03-01"));
    }

    #[test]
    fn test_channel_error_display() {
        assert_eq!(StateError::ChannelError.to_string(), "Channel error");
        assert!(!StateError::ChannelError.is_not_found());
    }
}
