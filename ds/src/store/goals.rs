//! Goal and habit operations

use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::debug;

use super::{Store, date_to_sql, opt_date_column, ts_column, ts_to_sql};
use crate::error::{DbContext, Result, StoreError};
use crate::records::{Goal, GoalUpdate, Habit, NewGoal, NewHabit};

const GOAL_COLUMNS: &str = "id, category, title, description, target_date, progress, is_active, created_at";
const HABIT_COLUMNS: &str = "id, title, category, frequency, streak, best_streak, is_active, created_at";

const INSERT_GOAL_SQL: &str =
    "INSERT INTO goals (category, title, description, target_date, created_at) VALUES (?1, ?2, ?3, ?4, ?5)";
const DELETE_GOAL_SQL: &str = "DELETE FROM goals WHERE id = ?1";
const INSERT_HABIT_SQL: &str = "INSERT INTO habits (title, category, frequency, created_at) VALUES (?1, ?2, ?3, ?4)";
const DELETE_HABIT_SQL: &str = "DELETE FROM habits WHERE id = ?1";
const UPSERT_HABIT_LOG_SQL: &str = "INSERT OR REPLACE INTO habit_logs (habit_id, date, completed) VALUES (?1, ?2, ?3)";
const INCREMENT_STREAK_SQL: &str =
    "UPDATE habits SET streak = streak + 1, best_streak = MAX(best_streak, streak + 1) WHERE id = ?1";
const RESET_STREAK_SQL: &str = "UPDATE habits SET streak = 0 WHERE id = ?1";

fn goal_from_row(row: &rusqlite::Row) -> rusqlite::Result<Goal> {
    Ok(Goal {
        id: row.get(0)?,
        category: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        target_date: opt_date_column(row, 4)?,
        progress: row.get(5)?,
        is_active: row.get(6)?,
        created_at: ts_column(row, 7)?,
    })
}

fn habit_from_row(row: &rusqlite::Row) -> rusqlite::Result<Habit> {
    Ok(Habit {
        id: row.get(0)?,
        title: row.get(1)?,
        category: row.get(2)?,
        frequency: row.get(3)?,
        streak: row.get(4)?,
        best_streak: row.get(5)?,
        is_active: row.get(6)?,
        created_at: ts_column(row, 7)?,
    })
}

fn load_goal(conn: &Connection, id: i64) -> Result<Goal> {
    conn.query_row(
        &format!("SELECT {} FROM goals WHERE id = ?1", GOAL_COLUMNS),
        params![id],
        goal_from_row,
    )
    .optional()
    .db_context("Failed to load goal")?
    .ok_or(StoreError::GoalNotFound(id))
}

fn load_habit(conn: &Connection, id: i64) -> Result<Habit> {
    conn.query_row(
        &format!("SELECT {} FROM habits WHERE id = ?1", HABIT_COLUMNS),
        params![id],
        habit_from_row,
    )
    .optional()
    .db_context("Failed to load habit")?
    .ok_or(StoreError::HabitNotFound(id))
}

impl Store {
    pub fn create_goal(&mut self, goal: &NewGoal) -> Result<Goal> {
        debug!(title = %goal.title, "create_goal: called");
        let tx = self.connection.transaction().db_context("Failed to begin transaction")?;
        tx.execute(
            INSERT_GOAL_SQL,
            params![
                &goal.category,
                &goal.title,
                &goal.description,
                goal.target_date.map(date_to_sql),
                ts_to_sql(crate::now())
            ],
        )
        .db_context("Failed to insert goal")?;
        let created = load_goal(&tx, tx.last_insert_rowid())?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(created)
    }

    /// Goals newest first; active ones first when `active_only` is false
    pub fn list_goals(&mut self, active_only: bool) -> Result<Vec<Goal>> {
        debug!(%active_only, "list_goals: called");
        let sql = if active_only {
            format!(
                "SELECT {} FROM goals WHERE is_active = 1 ORDER BY created_at DESC, id DESC",
                GOAL_COLUMNS
            )
        } else {
            format!(
                "SELECT {} FROM goals ORDER BY is_active DESC, created_at DESC, id DESC",
                GOAL_COLUMNS
            )
        };

        let tx = self.connection.transaction().db_context("Failed to begin transaction")?;
        let goals = {
            let mut stmt = tx.prepare(&sql).db_context("Failed to prepare goal query")?;
            stmt.query_map([], goal_from_row)
                .db_context("Failed to query goals")?
                .collect::<rusqlite::Result<Vec<_>>>()
                .db_context("Failed to read goal rows")?
        };
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(goals)
    }

    /// Apply the set fields of `update`; an empty update only checks the goal exists
    pub fn update_goal(&mut self, id: i64, update: &GoalUpdate) -> Result<Goal> {
        debug!(%id, ?update, "update_goal: called");
        let tx = self.connection.transaction().db_context("Failed to begin transaction")?;

        if !update.is_empty() {
            let mut sets: Vec<&str> = Vec::new();
            let mut values: Vec<Value> = Vec::new();
            if let Some(title) = &update.title {
                sets.push("title = ?");
                values.push(Value::Text(title.clone()));
            }
            if let Some(description) = &update.description {
                sets.push("description = ?");
                values.push(Value::Text(description.clone()));
            }
            if let Some(progress) = update.progress {
                sets.push("progress = ?");
                values.push(Value::Integer(progress.min(100) as i64));
            }
            if let Some(is_active) = update.is_active {
                sets.push("is_active = ?");
                values.push(Value::Integer(is_active as i64));
            }
            values.push(Value::Integer(id));

            let sql = format!("UPDATE goals SET {} WHERE id = ?", sets.join(", "));
            let changed = tx
                .execute(&sql, params_from_iter(values.iter()))
                .db_context("Failed to update goal")?;
            if changed == 0 {
                return Err(StoreError::GoalNotFound(id));
            }
        }

        let goal = load_goal(&tx, id)?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(goal)
    }

    pub fn delete_goal(&mut self, id: i64) -> Result<()> {
        debug!(%id, "delete_goal: called");
        let tx = self.connection.transaction().db_context("Failed to begin transaction")?;
        let changed = tx.execute(DELETE_GOAL_SQL, params![id]).db_context("Failed to delete goal")?;
        if changed == 0 {
            return Err(StoreError::GoalNotFound(id));
        }
        tx.commit().db_context("Failed to commit transaction")
    }

    pub fn create_habit(&mut self, habit: &NewHabit) -> Result<Habit> {
        debug!(title = %habit.title, "create_habit: called");
        let tx = self.connection.transaction().db_context("Failed to begin transaction")?;
        tx.execute(
            INSERT_HABIT_SQL,
            params![&habit.title, &habit.category, &habit.frequency, ts_to_sql(crate::now())],
        )
        .db_context("Failed to insert habit")?;
        let created = load_habit(&tx, tx.last_insert_rowid())?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(created)
    }

    /// Habits oldest first
    pub fn list_habits(&mut self, active_only: bool) -> Result<Vec<Habit>> {
        debug!(%active_only, "list_habits: called");
        let sql = if active_only {
            format!(
                "SELECT {} FROM habits WHERE is_active = 1 ORDER BY created_at, id",
                HABIT_COLUMNS
            )
        } else {
            format!(
                "SELECT {} FROM habits ORDER BY is_active DESC, created_at, id",
                HABIT_COLUMNS
            )
        };

        let tx = self.connection.transaction().db_context("Failed to begin transaction")?;
        let habits = {
            let mut stmt = tx.prepare(&sql).db_context("Failed to prepare habit query")?;
            stmt.query_map([], habit_from_row)
                .db_context("Failed to query habits")?
                .collect::<rusqlite::Result<Vec<_>>>()
                .db_context("Failed to read habit rows")?
        };
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(habits)
    }

    /// Record a habit check-in for a date and update its streak
    ///
    /// A completed check-in extends the streak (raising the best streak when
    /// passed); a missed one resets the streak to zero.
    pub fn log_habit(&mut self, id: i64, date: NaiveDate, completed: bool) -> Result<Habit> {
        debug!(%id, %date, %completed, "log_habit: called");
        let tx = self.connection.transaction().db_context("Failed to begin transaction")?;

        load_habit(&tx, id)?;
        tx.execute(UPSERT_HABIT_LOG_SQL, params![id, date_to_sql(date), completed])
            .db_context("Failed to log habit")?;

        let streak_sql = if completed { INCREMENT_STREAK_SQL } else { RESET_STREAK_SQL };
        tx.execute(streak_sql, params![id])
            .db_context("Failed to update habit streak")?;

        let habit = load_habit(&tx, id)?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(habit)
    }

    pub fn delete_habit(&mut self, id: i64) -> Result<()> {
        debug!(%id, "delete_habit: called");
        let tx = self.connection.transaction().db_context("Failed to begin transaction")?;
        let changed = tx
            .execute(DELETE_HABIT_SQL, params![id])
            .db_context("Failed to delete habit")?;
        if changed == 0 {
            return Err(StoreError::HabitNotFound(id));
        }
        tx.commit().db_context("Failed to commit transaction")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_goal(title: &str) -> NewGoal {
        NewGoal {
            category: "business".to_string(),
            title: title.to_string(),
            description: String::new(),
            target_date: NaiveDate::from_ymd_opt(2024, 12, 31),
        }
    }

    fn new_habit(title: &str) -> NewHabit {
        NewHabit {
            title: title.to_string(),
            category: "health".to_string(),
            frequency: "daily".to_string(),
        }
    }

    #[test]
    fn test_create_and_list_goals() {
        let mut store = Store::open_in_memory().unwrap();
        let goal = store.create_goal(&new_goal("Launch v2")).unwrap();
        assert_eq!(goal.title, "Launch v2");
        assert!(goal.is_active);
        assert_eq!(goal.progress, 0);
        assert_eq!(goal.target_date, NaiveDate::from_ymd_opt(2024, 12, 31));

        store.create_goal(&new_goal("Read 20 books")).unwrap();
        assert_eq!(store.list_goals(true).unwrap().len(), 2);
    }

    #[test]
    fn test_update_goal_partial() {
        let mut store = Store::open_in_memory().unwrap();
        let goal = store.create_goal(&new_goal("Launch v2")).unwrap();

        let updated = store
            .update_goal(
                goal.id,
                &GoalUpdate {
                    progress: Some(40),
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.title, "Launch v2");
        assert_eq!(updated.progress, 40);
        assert!(!updated.is_active);

        assert!(store.list_goals(true).unwrap().is_empty());
        assert_eq!(store.list_goals(false).unwrap().len(), 1);
    }

    #[test]
    fn test_update_missing_goal() {
        let mut store = Store::open_in_memory().unwrap();
        let update = GoalUpdate {
            title: Some("x".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            store.update_goal(9, &update).unwrap_err(),
            StoreError::GoalNotFound(9)
        ));
        assert!(matches!(
            store.update_goal(9, &GoalUpdate::default()).unwrap_err(),
            StoreError::GoalNotFound(9)
        ));
    }

    #[test]
    fn test_delete_goal() {
        let mut store = Store::open_in_memory().unwrap();
        let goal = store.create_goal(&new_goal("Launch v2")).unwrap();
        store.delete_goal(goal.id).unwrap();
        assert!(store.list_goals(false).unwrap().is_empty());
        assert!(store.delete_goal(goal.id).is_err());
    }

    #[test]
    fn test_habit_streaks() {
        let mut store = Store::open_in_memory().unwrap();
        let habit = store.create_habit(&new_habit("Meditate")).unwrap();
        assert_eq!(habit.streak, 0);

        let d1 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let d3 = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();

        store.log_habit(habit.id, d1, true).unwrap();
        let h = store.log_habit(habit.id, d2, true).unwrap();
        assert_eq!(h.streak, 2);
        assert_eq!(h.best_streak, 2);

        let h = store.log_habit(habit.id, d3, false).unwrap();
        assert_eq!(h.streak, 0);
        assert_eq!(h.best_streak, 2);
    }

    #[test]
    fn test_log_unknown_habit() {
        let mut store = Store::open_in_memory().unwrap();
        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(matches!(
            store.log_habit(5, d, true).unwrap_err(),
            StoreError::HabitNotFound(5)
        ));
    }

    #[test]
    fn test_list_habits_active_only() {
        let mut store = Store::open_in_memory().unwrap();
        let h = store.create_habit(&new_habit("Meditate")).unwrap();
        store.create_habit(&new_habit("Stretch")).unwrap();
        store.delete_habit(h.id).unwrap();

        let habits = store.list_habits(true).unwrap();
        assert_eq!(habits.len(), 1);
        assert_eq!(habits[0].title, "Stretch");
    }
}
