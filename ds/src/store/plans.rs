//! Plan and task operations

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::{debug, info};

use super::{Store, date_to_sql, plan_from_row, task_from_row, ts_to_sql};
use crate::error::{DbContext, Result, StoreError};
use crate::records::{NewTask, Plan, PlanView, PositionedTask, Task, TaskOrigin, completion_percent};

const SELECT_PLAN_BY_DATE_SQL: &str =
    "SELECT id, date, focus, energy_level, created_at, updated_at FROM plans WHERE date = ?1";
const SELECT_RECENT_PLANS_SQL: &str =
    "SELECT id, date, focus, energy_level, created_at, updated_at FROM plans ORDER BY date DESC LIMIT ?1";
const SELECT_PLAN_ID_BY_DATE_SQL: &str = "SELECT id FROM plans WHERE date = ?1";
const SELECT_TASKS_BY_PLAN_SQL: &str = "SELECT id, plan_id, category, title, description, time_slot, duration_min, priority, is_completed, completed_at, is_ai_generated, sort_order FROM tasks WHERE plan_id = ?1 ORDER BY sort_order, time_slot, id";
const SELECT_TASK_BY_ID_SQL: &str = "SELECT id, plan_id, category, title, description, time_slot, duration_min, priority, is_completed, completed_at, is_ai_generated, sort_order FROM tasks WHERE id = ?1";
const INSERT_PLAN_SQL: &str =
    "INSERT INTO plans (date, focus, energy_level, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)";
const UPDATE_PLAN_SQL: &str = "UPDATE plans SET focus = ?1, energy_level = ?2, updated_at = ?3 WHERE id = ?4";
const DELETE_AI_TASKS_SQL: &str = "DELETE FROM tasks WHERE plan_id = ?1 AND is_ai_generated = 1";
const INSERT_TASK_SQL: &str = "INSERT INTO tasks (plan_id, category, title, description, time_slot, duration_min, priority, is_ai_generated, sort_order) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";
const NEXT_SORT_ORDER_SQL: &str = "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM tasks WHERE plan_id = ?1";
const UPDATE_TASK_COMPLETION_SQL: &str = "UPDATE tasks SET is_completed = ?1, completed_at = ?2 WHERE id = ?3";
const DELETE_TASK_SQL: &str = "DELETE FROM tasks WHERE id = ?1";
const DELETE_PLAN_SQL: &str = "DELETE FROM plans WHERE date = ?1";

/// Result of writing a generated plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedPlan {
    pub plan_id: i64,
    /// True when the plan row did not exist before
    pub created: bool,
    /// AI tasks deleted from the previous generation
    pub replaced: usize,
    /// AI tasks inserted by this generation
    pub inserted: usize,
}

fn tasks_for_plan(conn: &Connection, plan_id: i64) -> Result<Vec<Task>> {
    let mut stmt = conn
        .prepare(SELECT_TASKS_BY_PLAN_SQL)
        .db_context("Failed to prepare task query")?;
    let tasks = stmt
        .query_map(params![plan_id], task_from_row)
        .db_context("Failed to query tasks")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .db_context("Failed to read task rows")?;
    Ok(tasks)
}

fn into_view(conn: &Connection, plan: Plan) -> Result<PlanView> {
    let tasks = tasks_for_plan(conn, plan.id)?;
    let done = tasks.iter().filter(|t| t.is_completed).count() as u32;
    let progress = completion_percent(done, tasks.len() as u32);
    Ok(PlanView { plan, tasks, progress })
}

fn insert_task(conn: &Connection, plan_id: i64, task: &NewTask, origin: TaskOrigin, sort_order: i64) -> Result<i64> {
    conn.execute(
        INSERT_TASK_SQL,
        params![
            plan_id,
            task.category.as_str(),
            &task.title,
            &task.description,
            &task.time_slot,
            task.duration_min,
            task.priority.level(),
            origin.is_ai(),
            sort_order
        ],
    )
    .db_context("Failed to insert task")?;
    Ok(conn.last_insert_rowid())
}

impl Store {
    /// Fetch the plan for a date together with its tasks
    pub fn get_plan(&mut self, date: NaiveDate) -> Result<Option<PlanView>> {
        debug!(%date, "get_plan: called");
        let tx = self.connection.transaction().db_context("Failed to begin transaction")?;

        let plan = tx
            .query_row(SELECT_PLAN_BY_DATE_SQL, params![date_to_sql(date)], plan_from_row)
            .optional()
            .db_context("Failed to load plan")?;

        let view = match plan {
            Some(plan) => Some(into_view(&tx, plan)?),
            None => None,
        };

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(view)
    }

    /// Most recent plans first, each with its tasks
    pub fn list_plans(&mut self, limit: u32) -> Result<Vec<PlanView>> {
        debug!(%limit, "list_plans: called");
        let tx = self.connection.transaction().db_context("Failed to begin transaction")?;

        let plans = {
            let mut stmt = tx
                .prepare(SELECT_RECENT_PLANS_SQL)
                .db_context("Failed to prepare plan query")?;
            stmt.query_map(params![limit], plan_from_row)
                .db_context("Failed to query plans")?
                .collect::<rusqlite::Result<Vec<_>>>()
                .db_context("Failed to read plan rows")?
        };

        let views = plans
            .into_iter()
            .map(|plan| into_view(&tx, plan))
            .collect::<Result<Vec<_>>>()?;

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(views)
    }

    /// Upsert the plan for `date` and replace its AI-generated tasks
    ///
    /// Manual tasks on an existing plan are left as they are. The whole
    /// operation is one transaction.
    pub fn apply_generated_plan(
        &mut self,
        date: NaiveDate,
        focus: &str,
        energy_level: u8,
        tasks: &[PositionedTask],
    ) -> Result<AppliedPlan> {
        debug!(%date, %energy_level, task_count = tasks.len(), "apply_generated_plan: called");
        let tx = self.connection.transaction().db_context("Failed to begin transaction")?;
        let now = ts_to_sql(crate::now());

        let existing: Option<i64> = tx
            .query_row(SELECT_PLAN_ID_BY_DATE_SQL, params![date_to_sql(date)], |row| row.get(0))
            .optional()
            .db_context("Failed to look up plan")?;

        let (plan_id, created, replaced) = match existing {
            Some(plan_id) => {
                debug!(%plan_id, "apply_generated_plan: updating existing plan");
                tx.execute(UPDATE_PLAN_SQL, params![focus, energy_level, &now, plan_id])
                    .db_context("Failed to update plan")?;
                let replaced = tx
                    .execute(DELETE_AI_TASKS_SQL, params![plan_id])
                    .db_context("Failed to delete generated tasks")?;
                (plan_id, false, replaced)
            }
            None => {
                debug!("apply_generated_plan: inserting new plan");
                tx.execute(INSERT_PLAN_SQL, params![date_to_sql(date), focus, energy_level, &now])
                    .db_context("Failed to insert plan")?;
                (tx.last_insert_rowid(), true, 0)
            }
        };

        for positioned in tasks {
            insert_task(&tx, plan_id, &positioned.task, TaskOrigin::Ai, positioned.position)?;
        }

        tx.commit().db_context("Failed to commit transaction")?;

        info!(%date, %plan_id, created, replaced, inserted = tasks.len(), "Applied generated plan");
        Ok(AppliedPlan {
            plan_id,
            created,
            replaced,
            inserted: tasks.len(),
        })
    }

    /// Append a manual task to the plan for `date`
    pub fn add_manual_task(&mut self, date: NaiveDate, task: &NewTask) -> Result<Task> {
        debug!(%date, title = %task.title, "add_manual_task: called");
        let tx = self.connection.transaction().db_context("Failed to begin transaction")?;

        let plan_id: i64 = tx
            .query_row(SELECT_PLAN_ID_BY_DATE_SQL, params![date_to_sql(date)], |row| row.get(0))
            .optional()
            .db_context("Failed to look up plan")?
            .ok_or(StoreError::PlanNotFound(date))?;

        let sort_order: i64 = tx
            .query_row(NEXT_SORT_ORDER_SQL, params![plan_id], |row| row.get(0))
            .db_context("Failed to get next sort order")?;

        let id = insert_task(&tx, plan_id, task, TaskOrigin::Manual, sort_order)?;
        let created = tx
            .query_row(SELECT_TASK_BY_ID_SQL, params![id], task_from_row)
            .db_context("Failed to reload task")?;

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(created)
    }

    /// Mark a task done (stamping the completion time) or not done
    pub fn set_task_completed(&mut self, task_id: i64, completed: bool) -> Result<Task> {
        debug!(%task_id, %completed, "set_task_completed: called");
        let tx = self.connection.transaction().db_context("Failed to begin transaction")?;

        let completed_at = completed.then(|| ts_to_sql(crate::now()));
        let changed = tx
            .execute(UPDATE_TASK_COMPLETION_SQL, params![completed, completed_at, task_id])
            .db_context("Failed to update task")?;
        if changed == 0 {
            return Err(StoreError::TaskNotFound(task_id));
        }

        let task = tx
            .query_row(SELECT_TASK_BY_ID_SQL, params![task_id], task_from_row)
            .db_context("Failed to reload task")?;

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(task)
    }

    pub fn delete_task(&mut self, task_id: i64) -> Result<()> {
        debug!(%task_id, "delete_task: called");
        let tx = self.connection.transaction().db_context("Failed to begin transaction")?;
        let changed = tx
            .execute(DELETE_TASK_SQL, params![task_id])
            .db_context("Failed to delete task")?;
        if changed == 0 {
            return Err(StoreError::TaskNotFound(task_id));
        }
        tx.commit().db_context("Failed to commit transaction")
    }

    /// Delete a plan; its tasks go with it
    pub fn delete_plan(&mut self, date: NaiveDate) -> Result<()> {
        debug!(%date, "delete_plan: called");
        let tx = self.connection.transaction().db_context("Failed to begin transaction")?;
        let changed = tx
            .execute(DELETE_PLAN_SQL, params![date_to_sql(date)])
            .db_context("Failed to delete plan")?;
        if changed == 0 {
            return Err(StoreError::PlanNotFound(date));
        }
        tx.commit().db_context("Failed to commit transaction")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Category, Priority};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn generated(titles: &[&str]) -> Vec<PositionedTask> {
        titles
            .iter()
            .enumerate()
            .map(|(i, title)| PositionedTask {
                position: i as i64,
                task: NewTask::new(*title),
            })
            .collect()
    }

    #[test]
    fn test_apply_creates_plan_with_ai_tasks() {
        let mut store = Store::open_in_memory().unwrap();
        let applied = store
            .apply_generated_plan(date(), "ship feature X", 8, &generated(&["a", "b", "c"]))
            .unwrap();

        assert!(applied.created);
        assert_eq!(applied.inserted, 3);
        assert_eq!(applied.replaced, 0);

        let view = store.get_plan(date()).unwrap().unwrap();
        assert_eq!(view.plan.id, applied.plan_id);
        assert_eq!(view.plan.focus, "ship feature X");
        assert_eq!(view.plan.energy_level, 8);
        assert_eq!(view.tasks.len(), 3);
        assert!(view.tasks.iter().all(|t| t.origin == TaskOrigin::Ai));
        let orders: Vec<i64> = view.tasks.iter().map(|t| t.sort_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn test_regenerate_keeps_manual_tasks() {
        let mut store = Store::open_in_memory().unwrap();
        let first = store
            .apply_generated_plan(date(), "", 7, &generated(&["a1", "a2", "a3"]))
            .unwrap();

        let mut manual = NewTask::new("Call mom");
        manual.category = Category::Personal;
        manual.priority = Priority::Critical;
        let manual = store.add_manual_task(date(), &manual).unwrap();
        assert_eq!(manual.origin, TaskOrigin::Manual);
        assert_eq!(manual.sort_order, 3);

        let second = store
            .apply_generated_plan(date(), "new focus", 5, &generated(&["b1", "b2"]))
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.plan_id, first.plan_id);
        assert_eq!(second.replaced, 3);

        let view = store.get_plan(date()).unwrap().unwrap();
        assert_eq!(view.tasks.len(), 3);
        assert_eq!(view.plan.focus, "new focus");

        let ai: Vec<&str> = view
            .tasks
            .iter()
            .filter(|t| t.origin.is_ai())
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(ai, vec!["b1", "b2"]);

        let kept = view.tasks.iter().find(|t| t.origin == TaskOrigin::Manual).unwrap();
        assert_eq!(kept, &manual);
    }

    #[test]
    fn test_regenerate_updates_timestamp() {
        let mut store = Store::open_in_memory().unwrap();
        store.apply_generated_plan(date(), "", 7, &[]).unwrap();
        let before = store.get_plan(date()).unwrap().unwrap().plan;

        std::thread::sleep(std::time::Duration::from_millis(10));
        store.apply_generated_plan(date(), "", 7, &[]).unwrap();
        let after = store.get_plan(date()).unwrap().unwrap().plan;

        assert!(after.updated_at > before.updated_at);
        assert_eq!(after.created_at, before.created_at);
    }

    #[test]
    fn test_add_manual_task_requires_plan() {
        let mut store = Store::open_in_memory().unwrap();
        let err = store.add_manual_task(date(), &NewTask::new("x")).unwrap_err();
        assert!(matches!(err, StoreError::PlanNotFound(d) if d == date()));
    }

    #[test]
    fn test_manual_task_on_empty_plan_starts_at_zero() {
        let mut store = Store::open_in_memory().unwrap();
        store.apply_generated_plan(date(), "", 7, &[]).unwrap();
        let task = store.add_manual_task(date(), &NewTask::new("x")).unwrap();
        assert_eq!(task.sort_order, 0);
    }

    #[test]
    fn test_set_task_completed_stamps_time() {
        let mut store = Store::open_in_memory().unwrap();
        store.apply_generated_plan(date(), "", 7, &generated(&["a", "b"])).unwrap();
        let id = store.get_plan(date()).unwrap().unwrap().tasks[0].id;

        let done = store.set_task_completed(id, true).unwrap();
        assert!(done.is_completed);
        assert!(done.completed_at.is_some());
        assert_eq!(store.get_plan(date()).unwrap().unwrap().progress, 50);

        let undone = store.set_task_completed(id, false).unwrap();
        assert!(!undone.is_completed);
        assert!(undone.completed_at.is_none());
    }

    #[test]
    fn test_task_not_found() {
        let mut store = Store::open_in_memory().unwrap();
        assert!(matches!(
            store.set_task_completed(42, true).unwrap_err(),
            StoreError::TaskNotFound(42)
        ));
        assert!(matches!(store.delete_task(42).unwrap_err(), StoreError::TaskNotFound(42)));
    }

    #[test]
    fn test_delete_plan_cascades() {
        let mut store = Store::open_in_memory().unwrap();
        store.apply_generated_plan(date(), "", 7, &generated(&["a"])).unwrap();
        store.delete_plan(date()).unwrap();
        assert!(store.get_plan(date()).unwrap().is_none());

        let orphans: i64 = store
            .connection
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn test_list_plans_newest_first() {
        let mut store = Store::open_in_memory().unwrap();
        for day in 1..=3 {
            let d = NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
            store.apply_generated_plan(d, "", 7, &[]).unwrap();
        }

        let plans = store.list_plans(2).unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].plan.date, NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());
        assert_eq!(plans[1].plan.date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
    }

    #[test]
    fn test_tasks_ordered_by_sort_order() {
        let mut store = Store::open_in_memory().unwrap();
        let tasks = vec![
            PositionedTask {
                position: 4,
                task: NewTask::new("later"),
            },
            PositionedTask {
                position: 1,
                task: NewTask::new("earlier"),
            },
        ];
        store.apply_generated_plan(date(), "", 7, &tasks).unwrap();
        let view = store.get_plan(date()).unwrap().unwrap();
        assert_eq!(view.tasks[0].title, "earlier");
        assert_eq!(view.tasks[1].title, "later");
    }
}
