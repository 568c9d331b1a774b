//! Plan reconciliation
//!
//! Writes a parsed generation response into the plan for its date: the plan
//! is upserted and its AI tasks replaced, manual tasks stay as they are.

use chrono::NaiveDate;
use daystore::PositionedTask;
use serde::Serialize;
use tracing::{debug, info};

use super::draft::{PlanDraft, TaskDraft};
use crate::state::{StateManager, StateResponse};

/// What a successful generation returns to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationOutcome {
    pub plan_id: i64,
    pub date: NaiveDate,
    pub big_three: Vec<String>,
    pub daily_tip: String,
    pub evening_routine: String,
    /// AI tasks inserted (untitled drafts are not counted)
    pub tasks_created: usize,
}

/// Usable drafts, each positioned at its index in the model's list
///
/// Skipped drafts leave a gap in the positions.
pub fn positioned_tasks(drafts: &[TaskDraft]) -> Vec<PositionedTask> {
    drafts
        .iter()
        .enumerate()
        .filter_map(|(index, draft)| {
            draft.to_new_task().map(|task| PositionedTask {
                position: index as i64,
                task,
            })
        })
        .collect()
}

/// Persist `draft` as the plan for `date` in one store transaction
pub async fn reconcile(
    state: &StateManager,
    date: NaiveDate,
    focus: &str,
    energy_level: u8,
    draft: PlanDraft,
) -> StateResponse<GenerationOutcome> {
    debug!(%date, draft_count = draft.tasks.len(), "reconcile: called");
    let tasks = positioned_tasks(&draft.tasks);
    let skipped = draft.tasks.len() - tasks.len();
    if skipped > 0 {
        debug!(%skipped, "reconcile: skipping untitled drafts");
    }

    let applied = state
        .apply_generated_plan(date, focus.to_string(), energy_level, tasks)
        .await?;

    info!(%date, plan_id = %applied.plan_id, tasks = %applied.inserted, replaced = %applied.replaced, "Plan reconciled");
    Ok(GenerationOutcome {
        plan_id: applied.plan_id,
        date,
        big_three: draft.big_three,
        daily_tip: draft.daily_tip,
        evening_routine: draft.evening_routine,
        tasks_created: applied.inserted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use daystore::{NewTask, TaskOrigin};
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn draft_with(titles: &[&str]) -> PlanDraft {
        let tasks: Vec<_> = titles.iter().map(|t| json!({ "title": t })).collect();
        PlanDraft::from_value(&json!({ "tasks": tasks, "big_three": ["one"] }))
    }

    #[test]
    fn test_positions_keep_gaps() {
        let draft = draft_with(&["a", "", "c"]);
        let tasks = positioned_tasks(&draft.tasks);
        let positions: Vec<i64> = tasks.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 2]);
        assert_eq!(tasks[1].task.title, "c");
    }

    #[tokio::test]
    async fn test_reconcile_new_plan() {
        let state = StateManager::spawn_in_memory().unwrap();
        let outcome = reconcile(&state, date("2024-03-01"), "ship", 8, draft_with(&["a", "b", ""]))
            .await
            .unwrap();

        assert_eq!(outcome.tasks_created, 2);
        assert_eq!(outcome.big_three, vec!["one".to_string()]);

        let view = state.get_plan_required(date("2024-03-01")).await.unwrap();
        assert_eq!(view.plan.id, outcome.plan_id);
        assert_eq!(view.plan.focus, "ship");
        assert!(view.tasks.iter().all(|t| t.origin == TaskOrigin::Ai));
    }

    #[tokio::test]
    async fn test_reconcile_preserves_manual_tasks() {
        let state = StateManager::spawn_in_memory().unwrap();
        let day = date("2024-03-01");
        let first = reconcile(&state, day, "", 7, draft_with(&["a", "b", "c"])).await.unwrap();
        let manual = state.add_manual_task(day, NewTask::new("Забрать посылку")).await.unwrap();

        let second = reconcile(&state, day, "new focus", 5, draft_with(&["x", "y"])).await.unwrap();
        assert_eq!(second.plan_id, first.plan_id);
        assert_eq!(second.tasks_created, 2);

        let view = state.get_plan_required(day).await.unwrap();
        assert_eq!(view.tasks.len(), 3);
        assert_eq!(view.plan.focus, "new focus");
        assert_eq!(view.plan.energy_level, 5);

        let kept = view.tasks.iter().find(|t| t.id == manual.id).unwrap();
        assert_eq!(kept, &manual);

        let ai_titles: Vec<&str> = view
            .tasks
            .iter()
            .filter(|t| t.origin.is_ai())
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(ai_titles, vec!["x", "y"]);
    }
}
