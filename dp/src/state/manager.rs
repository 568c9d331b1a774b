//! StateManager actor implementation
//!
//! The actor owns the [`Store`] connection and runs commands one at a time,
//! so no two store operations ever interleave.

use std::path::Path;

use chrono::NaiveDate;
use daystore::{
    AppliedPlan, GenerationContext, Goal, GoalUpdate, Habit, NewGoal, NewHabit, NewTask, PlanView, PositionedTask,
    Reflection, Stats, Store, Task,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::messages::{StateCommand, StateError, StateResponse};

/// Handle to send commands to the StateManager
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
}

impl StateManager {
    /// Spawn a new StateManager actor over the database at `db_path`
    pub fn spawn(db_path: impl AsRef<Path>) -> eyre::Result<Self> {
        debug!(db_path = %db_path.as_ref().display(), "spawn: called");
        let store = Store::open(db_path.as_ref())?;
        Ok(Self::spawn_with_store(store))
    }

    /// Spawn an actor over a private in-memory database
    pub fn spawn_in_memory() -> eyre::Result<Self> {
        debug!("spawn_in_memory: called");
        Ok(Self::spawn_with_store(Store::open_in_memory()?))
    }

    fn spawn_with_store(store: Store) -> Self {
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(store, rx));
        info!("StateManager spawned");
        Self { tx }
    }

    /// Send a command built around a fresh reply channel and await the reply
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<StateResponse<T>>) -> StateCommand,
    ) -> StateResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    // === Plan operations ===

    pub async fn get_plan(&self, date: NaiveDate) -> StateResponse<Option<PlanView>> {
        debug!(%date, "get_plan: called");
        self.request(|reply| StateCommand::GetPlan { date, reply }).await
    }

    /// Get a plan, treating absence as an error
    pub async fn get_plan_required(&self, date: NaiveDate) -> StateResponse<PlanView> {
        debug!(%date, "get_plan_required: called");
        self.get_plan(date)
            .await?
            .ok_or_else(|| StateError::NotFound(format!("Plan not found for date {}", date)))
    }

    pub async fn list_plans(&self, limit: u32) -> StateResponse<Vec<PlanView>> {
        debug!(%limit, "list_plans: called");
        self.request(|reply| StateCommand::ListPlans { limit, reply }).await
    }

    /// Upsert the plan for `date` and replace its AI tasks in one transaction
    pub async fn apply_generated_plan(
        &self,
        date: NaiveDate,
        focus: String,
        energy_level: u8,
        tasks: Vec<PositionedTask>,
    ) -> StateResponse<AppliedPlan> {
        debug!(%date, %energy_level, task_count = tasks.len(), "apply_generated_plan: called");
        self.request(|reply| StateCommand::ApplyGeneratedPlan {
            date,
            focus,
            energy_level,
            tasks,
            reply,
        })
        .await
    }

    pub async fn delete_plan(&self, date: NaiveDate) -> StateResponse<()> {
        debug!(%date, "delete_plan: called");
        self.request(|reply| StateCommand::DeletePlan { date, reply }).await
    }

    // === Task operations ===

    pub async fn add_manual_task(&self, date: NaiveDate, task: NewTask) -> StateResponse<Task> {
        debug!(%date, title = %task.title, "add_manual_task: called");
        self.request(|reply| StateCommand::AddManualTask { date, task, reply })
            .await
    }

    pub async fn set_task_completed(&self, id: i64, completed: bool) -> StateResponse<Task> {
        debug!(%id, %completed, "set_task_completed: called");
        self.request(|reply| StateCommand::SetTaskCompleted { id, completed, reply })
            .await
    }

    pub async fn delete_task(&self, id: i64) -> StateResponse<()> {
        debug!(%id, "delete_task: called");
        self.request(|reply| StateCommand::DeleteTask { id, reply }).await
    }

    // === Goal operations ===

    pub async fn create_goal(&self, goal: NewGoal) -> StateResponse<Goal> {
        debug!(title = %goal.title, "create_goal: called");
        self.request(|reply| StateCommand::CreateGoal { goal, reply }).await
    }

    pub async fn list_goals(&self, active_only: bool) -> StateResponse<Vec<Goal>> {
        debug!(%active_only, "list_goals: called");
        self.request(|reply| StateCommand::ListGoals { active_only, reply })
            .await
    }

    pub async fn update_goal(&self, id: i64, update: GoalUpdate) -> StateResponse<Goal> {
        debug!(%id, ?update, "update_goal: called");
        self.request(|reply| StateCommand::UpdateGoal { id, update, reply })
            .await
    }

    pub async fn delete_goal(&self, id: i64) -> StateResponse<()> {
        debug!(%id, "delete_goal: called");
        self.request(|reply| StateCommand::DeleteGoal { id, reply }).await
    }

    // === Habit operations ===

    pub async fn create_habit(&self, habit: NewHabit) -> StateResponse<Habit> {
        debug!(title = %habit.title, "create_habit: called");
        self.request(|reply| StateCommand::CreateHabit { habit, reply }).await
    }

    pub async fn list_habits(&self, active_only: bool) -> StateResponse<Vec<Habit>> {
        debug!(%active_only, "list_habits: called");
        self.request(|reply| StateCommand::ListHabits { active_only, reply })
            .await
    }

    pub async fn log_habit(&self, id: i64, date: NaiveDate, completed: bool) -> StateResponse<Habit> {
        debug!(%id, %date, %completed, "log_habit: called");
        self.request(|reply| StateCommand::LogHabit {
            id,
            date,
            completed,
            reply,
        })
        .await
    }

    pub async fn delete_habit(&self, id: i64) -> StateResponse<()> {
        debug!(%id, "delete_habit: called");
        self.request(|reply| StateCommand::DeleteHabit { id, reply }).await
    }

    // === Reflection operations ===

    pub async fn get_reflection(&self, date: NaiveDate) -> StateResponse<Option<Reflection>> {
        debug!(%date, "get_reflection: called");
        self.request(|reply| StateCommand::GetReflection { date, reply }).await
    }

    pub async fn upsert_reflection(&self, reflection: Reflection) -> StateResponse<()> {
        debug!(date = %reflection.date, "upsert_reflection: called");
        self.request(|reply| StateCommand::UpsertReflection { reflection, reply })
            .await
    }

    // === Read models ===

    /// Snapshot of goals, habits and the previous day for plan generation
    pub async fn generation_context(&self, date: NaiveDate) -> StateResponse<GenerationContext> {
        debug!(%date, "generation_context: called");
        self.request(|reply| StateCommand::GenerationContext { date, reply })
            .await
    }

    pub async fn stats(&self, today: NaiveDate) -> StateResponse<Stats> {
        debug!(%today, "stats: called");
        self.request(|reply| StateCommand::Stats { today, reply }).await
    }

    /// Shutdown the StateManager
    pub async fn shutdown(&self) -> Result<(), StateError> {
        debug!("shutdown: called");
        self.tx
            .send(StateCommand::Shutdown)
            .await
            .map_err(|_| StateError::ChannelError)
    }
}

/// The actor loop that processes commands
async fn actor_loop(mut store: Store, mut rx: mpsc::Receiver<StateCommand>) {
    debug!("StateManager actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            // Plan operations
            StateCommand::GetPlan { date, reply } => {
                debug!(%date, "actor_loop: GetPlan command");
                let _ = reply.send(store.get_plan(date).map_err(StateError::from));
            }

            StateCommand::ListPlans { limit, reply } => {
                debug!(%limit, "actor_loop: ListPlans command");
                let _ = reply.send(store.list_plans(limit).map_err(StateError::from));
            }

            StateCommand::ApplyGeneratedPlan {
                date,
                focus,
                energy_level,
                tasks,
                reply,
            } => {
                debug!(%date, task_count = tasks.len(), "actor_loop: ApplyGeneratedPlan command");
                let result = store
                    .apply_generated_plan(date, &focus, energy_level, &tasks)
                    .map_err(StateError::from);
                let _ = reply.send(result);
            }

            StateCommand::DeletePlan { date, reply } => {
                debug!(%date, "actor_loop: DeletePlan command");
                let _ = reply.send(store.delete_plan(date).map_err(StateError::from));
            }

            // Task operations
            StateCommand::AddManualTask { date, task, reply } => {
                debug!(%date, "actor_loop: AddManualTask command");
                let _ = reply.send(store.add_manual_task(date, &task).map_err(StateError::from));
            }

            StateCommand::SetTaskCompleted { id, completed, reply } => {
                debug!(%id, %completed, "actor_loop: SetTaskCompleted command");
                let _ = reply.send(store.set_task_completed(id, completed).map_err(StateError::from));
            }

            StateCommand::DeleteTask { id, reply } => {
                debug!(%id, "actor_loop: DeleteTask command");
                let _ = reply.send(store.delete_task(id).map_err(StateError::from));
            }

            // Goal operations
            StateCommand::CreateGoal { goal, reply } => {
                debug!("actor_loop: CreateGoal command");
                let _ = reply.send(store.create_goal(&goal).map_err(StateError::from));
            }

            StateCommand::ListGoals { active_only, reply } => {
                debug!(%active_only, "actor_loop: ListGoals command");
                let _ = reply.send(store.list_goals(active_only).map_err(StateError::from));
            }

            StateCommand::UpdateGoal { id, update, reply } => {
                debug!(%id, "actor_loop: UpdateGoal command");
                let _ = reply.send(store.update_goal(id, &update).map_err(StateError::from));
            }

            StateCommand::DeleteGoal { id, reply } => {
                debug!(%id, "actor_loop: DeleteGoal command");
                let _ = reply.send(store.delete_goal(id).map_err(StateError::from));
            }

            // Habit operations
            StateCommand::CreateHabit { habit, reply } => {
                debug!("actor_loop: CreateHabit command");
                let _ = reply.send(store.create_habit(&habit).map_err(StateError::from));
            }

            StateCommand::ListHabits { active_only, reply } => {
                debug!(%active_only, "actor_loop: ListHabits command");
                let _ = reply.send(store.list_habits(active_only).map_err(StateError::from));
            }

            StateCommand::LogHabit {
                id,
                date,
                completed,
                reply,
            } => {
                debug!(%id, %date, "actor_loop: LogHabit command");
                let _ = reply.send(store.log_habit(id, date, completed).map_err(StateError::from));
            }

            StateCommand::DeleteHabit { id, reply } => {
                debug!(%id, "actor_loop: DeleteHabit command");
                let _ = reply.send(store.delete_habit(id).map_err(StateError::from));
            }

            // Reflection operations
            StateCommand::GetReflection { date, reply } => {
                debug!(%date, "actor_loop: GetReflection command");
                let _ = reply.send(store.get_reflection(date).map_err(StateError::from));
            }

            StateCommand::UpsertReflection { reflection, reply } => {
                debug!(date = %reflection.date, "actor_loop: UpsertReflection command");
                let _ = reply.send(store.upsert_reflection(&reflection).map_err(StateError::from));
            }

            // Read models
            StateCommand::GenerationContext { date, reply } => {
                debug!(%date, "actor_loop: GenerationContext command");
                let _ = reply.send(store.generation_context(date).map_err(StateError::from));
            }

            StateCommand::Stats { today, reply } => {
                debug!(%today, "actor_loop: Stats command");
                let _ = reply.send(store.stats(today).map_err(StateError::from));
            }

            StateCommand::Shutdown => {
                info!("StateManager shutting down");
                break;
            }
        }
    }

    debug!("StateManager actor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use daystore::Category;
    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn drafts(titles: &[&str]) -> Vec<PositionedTask> {
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| PositionedTask {
                position: i as i64,
                task: NewTask::new(*t),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_plan_roundtrip_through_actor() {
        let temp = TempDir::new().unwrap();
        let state = StateManager::spawn(temp.path().join("planner.db")).unwrap();

        let applied = state
            .apply_generated_plan(date("2024-03-01"), "ship".to_string(), 8, drafts(&["a", "b"]))
            .await
            .unwrap();
        assert!(applied.created);
        assert_eq!(applied.inserted, 2);

        let view = state.get_plan_required(date("2024-03-01")).await.unwrap();
        assert_eq!(view.plan.id, applied.plan_id);
        assert_eq!(view.plan.energy_level, 8);
        assert_eq!(view.tasks.len(), 2);

        let plans = state.list_plans(30).await.unwrap();
        assert_eq!(plans.len(), 1);
    }

    #[tokio::test]
    async fn test_get_plan_required_not_found() {
        let state = StateManager::spawn_in_memory().unwrap();
        let err = state.get_plan_required(date("2024-03-01")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_manual_task_lifecycle() {
        let state = StateManager::spawn_in_memory().unwrap();
        state
            .apply_generated_plan(date("2024-03-01"), String::new(), 7, drafts(&["ai"]))
            .await
            .unwrap();

        let mut task = NewTask::new("Call mom");
        task.category = Category::Health;
        let added = state.add_manual_task(date("2024-03-01"), task).await.unwrap();
        assert!(!added.origin.is_ai());
        assert_eq!(added.category, Category::Health);

        let done = state.set_task_completed(added.id, true).await.unwrap();
        assert!(done.is_completed);
        assert!(done.completed_at.is_some());

        state.delete_task(added.id).await.unwrap();
        let err = state.delete_task(added.id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_manual_task_without_plan() {
        let state = StateManager::spawn_in_memory().unwrap();
        let err = state
            .add_manual_task(date("2024-03-01"), NewTask::new("orphan"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_generation_context_through_actor() {
        let state = StateManager::spawn_in_memory().unwrap();
        state
            .create_goal(NewGoal {
                category: "business".to_string(),
                title: "Launch v2".to_string(),
                description: String::new(),
                target_date: None,
            })
            .await
            .unwrap();

        let ctx = state.generation_context(date("2024-03-01")).await.unwrap();
        assert_eq!(ctx.goal_titles, vec!["Launch v2".to_string()]);
        assert!(ctx.habit_titles.is_empty());
        assert!(ctx.yesterday.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_closes_channel() {
        let state = StateManager::spawn_in_memory().unwrap();
        state.shutdown().await.unwrap();

        // The actor drops its receiver once it stops
        let mut closed = false;
        for _ in 0..50 {
            if state.list_plans(1).await.is_err() {
                closed = true;
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(closed);
    }
}
