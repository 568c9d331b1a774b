//! Reflections, the generation context snapshot, and aggregate stats

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use super::{Store, date_column, date_to_sql, ts_column, ts_to_sql};
use crate::error::{DbContext, Result};
use crate::records::{DayOutcome, GenerationContext, Reflection, ReflectionDigest, Stats, completion_percent};

const SELECT_REFLECTION_SQL: &str = "SELECT date, wins, lessons, mood, rating, notes, ai_summary, ai_next_day, day_score, updated_at FROM reflections WHERE date = ?1";
const UPSERT_REFLECTION_SQL: &str = r#"
INSERT INTO reflections (date, wins, lessons, mood, rating, notes, ai_summary, ai_next_day, day_score, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
ON CONFLICT(date) DO UPDATE SET
    wins = excluded.wins,
    lessons = excluded.lessons,
    mood = excluded.mood,
    rating = excluded.rating,
    notes = excluded.notes,
    ai_summary = excluded.ai_summary,
    ai_next_day = excluded.ai_next_day,
    day_score = excluded.day_score,
    updated_at = excluded.updated_at
"#;
const SELECT_ACTIVE_GOAL_TITLES_SQL: &str = "SELECT title FROM goals WHERE is_active = 1 ORDER BY id";
const SELECT_ACTIVE_HABIT_TITLES_SQL: &str = "SELECT title FROM habits WHERE is_active = 1 ORDER BY id";
const SELECT_PLAN_ID_BY_DATE_SQL: &str = "SELECT id FROM plans WHERE date = ?1";
const COUNT_PLAN_TASKS_SQL: &str = "SELECT COUNT(*), COALESCE(SUM(is_completed), 0) FROM tasks WHERE plan_id = ?1";

fn reflection_from_row(row: &rusqlite::Row) -> rusqlite::Result<Reflection> {
    Ok(Reflection {
        date: date_column(row, 0)?,
        wins: row.get(1)?,
        lessons: row.get(2)?,
        mood: row.get(3)?,
        rating: row.get(4)?,
        notes: row.get(5)?,
        ai_summary: row.get(6)?,
        ai_next_day: row.get(7)?,
        day_score: row.get(8)?,
        updated_at: ts_column(row, 9)?,
    })
}

fn titles(conn: &Connection, sql: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(sql).db_context("Failed to prepare title query")?;
    let titles = stmt
        .query_map([], |row| row.get(0))
        .db_context("Failed to query titles")?
        .collect::<rusqlite::Result<Vec<String>>>()
        .db_context("Failed to read titles")?;
    Ok(titles)
}

fn count(conn: &Connection, sql: &str) -> Result<u32> {
    conn.query_row(sql, [], |row| row.get(0))
        .db_context("Failed to count rows")
}

fn average(conn: &Connection, sql: &str) -> Result<Option<f64>> {
    let avg: Option<f64> = conn
        .query_row(sql, [], |row| row.get(0))
        .db_context("Failed to average rows")?;
    Ok(avg.map(|v| (v * 10.0).round() / 10.0))
}

impl Store {
    pub fn get_reflection(&mut self, date: NaiveDate) -> Result<Option<Reflection>> {
        debug!(%date, "get_reflection: called");
        let tx = self.connection.transaction().db_context("Failed to begin transaction")?;
        let reflection = tx
            .query_row(SELECT_REFLECTION_SQL, params![date_to_sql(date)], reflection_from_row)
            .optional()
            .db_context("Failed to load reflection")?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(reflection)
    }

    /// Insert or replace the reflection for its date
    pub fn upsert_reflection(&mut self, reflection: &Reflection) -> Result<()> {
        debug!(date = %reflection.date, "upsert_reflection: called");
        let tx = self.connection.transaction().db_context("Failed to begin transaction")?;
        tx.execute(
            UPSERT_REFLECTION_SQL,
            params![
                date_to_sql(reflection.date),
                &reflection.wins,
                &reflection.lessons,
                reflection.mood,
                reflection.rating,
                &reflection.notes,
                &reflection.ai_summary,
                &reflection.ai_next_day,
                reflection.day_score,
                ts_to_sql(reflection.updated_at)
            ],
        )
        .db_context("Failed to save reflection")?;
        tx.commit().db_context("Failed to commit transaction")
    }

    /// Read everything plan generation needs about the user, in one transaction
    ///
    /// The previous day is only reported when it has a plan; its reflection
    /// is attached when one exists.
    pub fn generation_context(&mut self, date: NaiveDate) -> Result<GenerationContext> {
        debug!(%date, "generation_context: called");
        let tx = self.connection.transaction().db_context("Failed to begin transaction")?;

        let goal_titles = titles(&tx, SELECT_ACTIVE_GOAL_TITLES_SQL)?;
        let habit_titles = titles(&tx, SELECT_ACTIVE_HABIT_TITLES_SQL)?;

        let yesterday = match date.pred_opt() {
            Some(prev) => {
                let plan_id: Option<i64> = tx
                    .query_row(SELECT_PLAN_ID_BY_DATE_SQL, params![date_to_sql(prev)], |row| row.get(0))
                    .optional()
                    .db_context("Failed to look up previous plan")?;

                match plan_id {
                    Some(plan_id) => {
                        let (total, done): (u32, u32) = tx
                            .query_row(COUNT_PLAN_TASKS_SQL, params![plan_id], |row| {
                                Ok((row.get(0)?, row.get(1)?))
                            })
                            .db_context("Failed to count previous tasks")?;
                        let reflection = tx
                            .query_row(SELECT_REFLECTION_SQL, params![date_to_sql(prev)], reflection_from_row)
                            .optional()
                            .db_context("Failed to load previous reflection")?
                            .map(|r| ReflectionDigest {
                                mood: r.mood,
                                lessons: r.lessons,
                            });
                        Some(DayOutcome {
                            date: prev,
                            done,
                            total,
                            reflection,
                        })
                    }
                    None => None,
                }
            }
            None => None,
        };

        tx.commit().db_context("Failed to commit transaction")?;
        debug!(
            goals = goal_titles.len(),
            habits = habit_titles.len(),
            has_yesterday = yesterday.is_some(),
            "generation_context: loaded"
        );
        Ok(GenerationContext {
            goal_titles,
            habit_titles,
            yesterday,
        })
    }

    /// Aggregate counters; the streak counts back from `today`
    pub fn stats(&mut self, today: NaiveDate) -> Result<Stats> {
        debug!(%today, "stats: called");
        let tx = self.connection.transaction().db_context("Failed to begin transaction")?;

        let total_tasks = count(&tx, "SELECT COUNT(*) FROM tasks")?;
        let completed_tasks = count(&tx, "SELECT COUNT(*) FROM tasks WHERE is_completed = 1")?;
        let total_plans = count(&tx, "SELECT COUNT(*) FROM plans")?;
        let active_goals = count(&tx, "SELECT COUNT(*) FROM goals WHERE is_active = 1")?;
        let active_habits = count(&tx, "SELECT COUNT(*) FROM habits WHERE is_active = 1")?;
        let avg_mood = average(&tx, "SELECT AVG(mood) FROM reflections")?;
        let avg_rating = average(&tx, "SELECT AVG(rating) FROM reflections")?;

        let mut current_streak = 0;
        let mut day = Some(today);
        while let Some(d) = day {
            let plan_id: Option<i64> = tx
                .query_row(SELECT_PLAN_ID_BY_DATE_SQL, params![date_to_sql(d)], |row| row.get(0))
                .optional()
                .db_context("Failed to look up plan")?;
            let Some(plan_id) = plan_id else { break };

            let (_, done): (u32, u32) = tx
                .query_row(COUNT_PLAN_TASKS_SQL, params![plan_id], |row| Ok((row.get(0)?, row.get(1)?)))
                .db_context("Failed to count tasks")?;
            if done == 0 {
                break;
            }
            current_streak += 1;
            day = d.pred_opt();
        }

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(Stats {
            total_tasks,
            completed_tasks,
            completion_rate: completion_percent(completed_tasks, total_tasks),
            total_plans,
            active_goals,
            active_habits,
            avg_mood,
            avg_rating,
            current_streak,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{NewGoal, NewHabit, NewTask, PositionedTask};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn tasks(n: usize) -> Vec<PositionedTask> {
        (0..n)
            .map(|i| PositionedTask {
                position: i as i64,
                task: NewTask::new(format!("task {}", i)),
            })
            .collect()
    }

    #[test]
    fn test_reflection_upsert_replaces() {
        let mut store = Store::open_in_memory().unwrap();
        let mut r = Reflection::new(day(1));
        r.wins = "shipped".to_string();
        r.mood = 7;
        store.upsert_reflection(&r).unwrap();

        r.lessons = "sleep earlier".to_string();
        r.day_score = 80;
        store.upsert_reflection(&r).unwrap();

        let loaded = store.get_reflection(day(1)).unwrap().unwrap();
        assert_eq!(loaded.wins, "shipped");
        assert_eq!(loaded.lessons, "sleep earlier");
        assert_eq!(loaded.day_score, 80);
        assert!(store.get_reflection(day(2)).unwrap().is_none());
    }

    #[test]
    fn test_generation_context_empty() {
        let mut store = Store::open_in_memory().unwrap();
        let ctx = store.generation_context(day(1)).unwrap();
        assert_eq!(ctx, GenerationContext::default());
    }

    #[test]
    fn test_generation_context_active_only() {
        let mut store = Store::open_in_memory().unwrap();
        let goal = store
            .create_goal(&NewGoal {
                category: "business".to_string(),
                title: "Launch v2".to_string(),
                description: String::new(),
                target_date: None,
            })
            .unwrap();
        let old = store
            .create_goal(&NewGoal {
                category: "learning".to_string(),
                title: "Old goal".to_string(),
                description: String::new(),
                target_date: None,
            })
            .unwrap();
        store
            .update_goal(
                old.id,
                &crate::GoalUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        store
            .create_habit(&NewHabit {
                title: "Meditate".to_string(),
                category: "mindset".to_string(),
                frequency: "daily".to_string(),
            })
            .unwrap();

        let ctx = store.generation_context(day(2)).unwrap();
        assert_eq!(ctx.goal_titles, vec![goal.title]);
        assert_eq!(ctx.habit_titles, vec!["Meditate".to_string()]);
        assert!(ctx.yesterday.is_none());
    }

    #[test]
    fn test_generation_context_yesterday() {
        let mut store = Store::open_in_memory().unwrap();
        store.apply_generated_plan(day(1), "", 7, &tasks(4)).unwrap();
        let ids: Vec<i64> = store.get_plan(day(1)).unwrap().unwrap().tasks.iter().map(|t| t.id).collect();
        store.set_task_completed(ids[0], true).unwrap();
        store.set_task_completed(ids[1], true).unwrap();
        store.set_task_completed(ids[2], true).unwrap();

        let ctx = store.generation_context(day(2)).unwrap();
        let y = ctx.yesterday.unwrap();
        assert_eq!(y.date, day(1));
        assert_eq!((y.done, y.total), (3, 4));
        assert!(y.reflection.is_none());

        let mut r = Reflection::new(day(1));
        r.mood = 8;
        r.lessons = "less coffee".to_string();
        store.upsert_reflection(&r).unwrap();

        let y = store.generation_context(day(2)).unwrap().yesterday.unwrap();
        assert_eq!(
            y.reflection,
            Some(ReflectionDigest {
                mood: 8,
                lessons: "less coffee".to_string()
            })
        );
    }

    #[test]
    fn test_reflection_without_plan_is_not_reported() {
        let mut store = Store::open_in_memory().unwrap();
        store.upsert_reflection(&Reflection::new(day(1))).unwrap();
        assert!(store.generation_context(day(2)).unwrap().yesterday.is_none());
    }

    #[test]
    fn test_stats_streak() {
        let mut store = Store::open_in_memory().unwrap();
        for d in [1, 2, 3] {
            store.apply_generated_plan(day(d), "", 7, &tasks(2)).unwrap();
        }
        for d in [2, 3] {
            let id = store.get_plan(day(d)).unwrap().unwrap().tasks[0].id;
            store.set_task_completed(id, true).unwrap();
        }

        let stats = store.stats(day(3)).unwrap();
        assert_eq!(stats.total_plans, 3);
        assert_eq!(stats.total_tasks, 6);
        assert_eq!(stats.completed_tasks, 2);
        assert_eq!(stats.completion_rate, 33);
        assert_eq!(stats.current_streak, 2);
        assert!(stats.avg_mood.is_none());

        assert_eq!(store.stats(day(4)).unwrap().current_streak, 0);
    }

    #[test]
    fn test_stats_averages() {
        let mut store = Store::open_in_memory().unwrap();
        let mut r = Reflection::new(day(1));
        r.mood = 6;
        r.rating = 3;
        store.upsert_reflection(&r).unwrap();
        let mut r = Reflection::new(day(2));
        r.mood = 7;
        r.rating = 4;
        store.upsert_reflection(&r).unwrap();

        let stats = store.stats(day(2)).unwrap();
        assert_eq!(stats.avg_mood, Some(6.5));
        assert_eq!(stats.avg_rating, Some(3.5));
    }
}
