//! Integration tests for plan generation
//!
//! These run the full pipeline against an on-disk store: prompt composition,
//! one completion call, JSON extraction and the atomic task replacement.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use daystore::{NewGoal, NewTask, TaskOrigin};
use dayplanner::config::LlmConfig;
use dayplanner::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, OpenAIClient};
use dayplanner::planner::{DayPlanner, DayReview, GenerationRequest, PlannerError};
use dayplanner::prompts::PromptLoader;
use dayplanner::state::StateManager;

// =============================================================================
// Helpers
// =============================================================================

/// Replays canned answers and keeps the prompts it was sent
struct ScriptedClient {
    answers: Mutex<Vec<String>>,
    seen: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    fn new(answers: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.iter().rev().map(|s| s.to_string()).collect()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<CompletionRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.seen.lock().unwrap().push(request);
        match self.answers.lock().unwrap().pop() {
            Some(text) => Ok(CompletionResponse {
                content: Some(text),
                ..Default::default()
            }),
            None => Err(LlmError::InvalidResponse("script exhausted".to_string())),
        }
    }
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn open_state(dir: &TempDir) -> StateManager {
    StateManager::spawn(dir.path().join("planner.db")).expect("Failed to open store")
}

fn planner_with(state: StateManager, llm: Arc<dyn LlmClient>) -> DayPlanner {
    DayPlanner::new(
        state,
        llm,
        Arc::new(PromptLoader::embedded_only().expect("Embedded templates load")),
        &LlmConfig::default(),
    )
}

const TWO_TASKS_AND_A_BLANK: &str = r#"Вот ваш план:
```json
{
  "big_three": ["Фича X", "Тренировка", "Чтение"],
  "tasks": [
    {"category": "business", "title": "Фича X: API", "time_slot": "09:00-11:00", "duration_min": 120, "priority": 1},
    {"category": "health", "title": "Пробежка", "time_slot": "07:00-07:30", "duration_min": 30, "priority": 2},
    {"category": "learning", "description": "no title here"}
  ],
  "daily_tip": "Начни с самого сложного",
  "evening_routine": "Прогулка и чтение"
}
```"#;

const THREE_TASKS: &str = r#"{"tasks": [
  {"category": "business", "title": "A"},
  {"category": "business", "title": "B"},
  {"category": "business", "title": "C"}
]}"#;

const TWO_TASKS: &str = r#"{"tasks": [
  {"category": "learning", "title": "D"},
  {"category": "mindset", "title": "E"}
]}"#;

/// Answer exactly one HTTP request with the given status and body
async fn serve_once(status_line: &'static str, body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&raw);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|l| {
                        l.to_ascii_lowercase()
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                if raw.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        let response = format!(
            "{}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });

    format!("http://{}", addr)
}

// =============================================================================
// Generation Tests
// =============================================================================

#[tokio::test]
async fn test_generate_plan_end_to_end() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let state = open_state(&dir);
    state
        .create_goal(NewGoal {
            category: "work".to_string(),
            title: "Launch v2".to_string(),
            description: String::new(),
            target_date: None,
        })
        .await
        .unwrap();

    let llm = ScriptedClient::new(&[TWO_TASKS_AND_A_BLANK]);
    let planner = planner_with(state.clone(), llm.clone());

    let request = GenerationRequest::new(date("2024-03-01"))
        .with_focus("ship feature X")
        .with_energy(8);
    let outcome = planner.generate_plan(request).await.unwrap();

    assert_eq!(outcome.tasks_created, 2);
    assert_eq!(outcome.big_three.len(), 3);
    assert_eq!(outcome.daily_tip, "Начни с самого сложного");

    let seen = llm.seen();
    assert_eq!(seen.len(), 1);
    let prompt = seen[0].user_text().unwrap();
    assert!(prompt.contains("2024-03-01"));
    assert!(prompt.contains("Пятница"));
    assert!(prompt.contains("ship feature X"));
    assert!(prompt.contains("8/10"));
    assert!(prompt.contains("Launch v2"));
    assert!(prompt.contains("Нет данных"));

    let view = state.get_plan_required(date("2024-03-01")).await.unwrap();
    assert_eq!(view.plan.focus, "ship feature X");
    assert_eq!(view.plan.energy_level, 8);
    assert_eq!(view.tasks.len(), 2);
    assert!(view.tasks.iter().all(|t| t.origin == TaskOrigin::Ai));
    assert_eq!(view.progress, 0);
}

#[tokio::test]
async fn test_regeneration_keeps_manual_tasks() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let state = open_state(&dir);
    let day = date("2024-03-02");

    let llm = ScriptedClient::new(&[THREE_TASKS, TWO_TASKS]);
    let planner = planner_with(state.clone(), llm);

    let first = planner.generate_plan(GenerationRequest::new(day)).await.unwrap();
    assert_eq!(first.tasks_created, 3);

    let manual = state.add_manual_task(day, NewTask::new("Call mom")).await.unwrap();

    let second = planner.generate_plan(GenerationRequest::new(day)).await.unwrap();
    assert_eq!(second.plan_id, first.plan_id);
    assert_eq!(second.tasks_created, 2);

    let view = state.get_plan_required(day).await.unwrap();
    assert_eq!(view.tasks.len(), 3);
    let titles: Vec<_> = view.tasks.iter().map(|t| t.title.as_str()).collect();
    assert!(titles.contains(&"D"));
    assert!(titles.contains(&"E"));
    assert!(!titles.contains(&"A"));

    let kept = view.tasks.iter().find(|t| t.id == manual.id).expect("manual task kept");
    assert_eq!(kept, &manual);
}

#[tokio::test]
async fn test_plan_survives_store_reopen() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let day = date("2024-03-03");

    {
        let state = open_state(&dir);
        let planner = planner_with(state.clone(), ScriptedClient::new(&[TWO_TASKS]));
        planner.generate_plan(GenerationRequest::new(day)).await.unwrap();
        state.shutdown().await.unwrap();
    }

    let state = open_state(&dir);
    let view = state.get_plan_required(day).await.unwrap();
    assert_eq!(view.tasks.len(), 2);
}

#[tokio::test]
async fn test_unparseable_answer_leaves_state_unchanged() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let state = open_state(&dir);
    let day = date("2024-03-04");

    let llm = ScriptedClient::new(&[THREE_TASKS, "Извините, не могу помочь."]);
    let planner = planner_with(state.clone(), llm);
    planner.generate_plan(GenerationRequest::new(day)).await.unwrap();
    let before = state.get_plan_required(day).await.unwrap();

    let err = planner.generate_plan(GenerationRequest::new(day)).await.unwrap_err();
    assert!(matches!(err, PlannerError::Unparseable(_)));

    let after = state.get_plan_required(day).await.unwrap();
    assert_eq!(before, after);
}

// =============================================================================
// Provider Tests
// =============================================================================

#[tokio::test]
async fn test_openai_client_drives_generation() {
    let content = serde_json::to_string(TWO_TASKS).unwrap();
    let body = format!(
        r#"{{"choices":[{{"message":{{"role":"assistant","content":{}}},"finish_reason":"stop"}}],"usage":{{"prompt_tokens":10,"completion_tokens":20}}}}"#,
        content
    );
    let base_url = serve_once("HTTP/1.1 200 OK", body).await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let state = open_state(&dir);
    let client = OpenAIClient::new("test-model", "test-key", base_url).unwrap();
    let planner = planner_with(state.clone(), Arc::new(client));

    let outcome = planner.generate_plan(GenerationRequest::new(date("2024-03-05"))).await.unwrap();
    assert_eq!(outcome.tasks_created, 2);
}

#[tokio::test]
async fn test_provider_error_leaves_state_unchanged() {
    let base_url = serve_once(
        "HTTP/1.1 500 Internal Server Error",
        r#"{"error":{"message":"overloaded"}}"#.to_string(),
    )
    .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let state = open_state(&dir);
    let day = date("2024-03-06");
    let client = OpenAIClient::new("test-model", "test-key", base_url).unwrap();
    let planner = planner_with(state.clone(), Arc::new(client));

    let err = planner.generate_plan(GenerationRequest::new(day)).await.unwrap_err();
    match err {
        PlannerError::Completion(LlmError::ApiError { status, .. }) => assert_eq!(status, 500),
        other => panic!("Expected provider error, got {:?}", other),
    }

    assert!(state.get_plan(day).await.unwrap().is_none());
    assert!(state.list_plans(10).await.unwrap().is_empty());
}

// =============================================================================
// Reflection Tests
// =============================================================================

#[tokio::test]
async fn test_reflection_feeds_next_day_prompt() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let state = open_state(&dir);
    let yesterday = date("2024-03-07");
    let today = date("2024-03-08");

    let analysis = r#"{"summary": "Хороший день", "next_day": ["Раньше лечь"], "score": 80}"#;
    let llm = ScriptedClient::new(&[THREE_TASKS, analysis, TWO_TASKS]);
    let planner = planner_with(state.clone(), llm.clone());

    planner.generate_plan(GenerationRequest::new(yesterday)).await.unwrap();
    let view = state.get_plan_required(yesterday).await.unwrap();
    state.set_task_completed(view.tasks[0].id, true).await.unwrap();

    let mut review = DayReview::new(yesterday);
    review.wins = "Сделал API".to_string();
    review.lessons = "Меньше встреч".to_string();
    review.mood = 8;
    let outcome = planner.save_reflection(review).await.unwrap();
    assert_eq!(outcome.analysis.ai_summary, "Хороший день");
    assert_eq!(outcome.analysis.day_score, 80);

    planner.generate_plan(GenerationRequest::new(today)).await.unwrap();
    let seen = llm.seen();
    let prompt = seen[2].user_text().unwrap();
    assert!(prompt.contains("Выполнено 1/3 задач (33%)"));
    assert!(prompt.contains("Настроение: 8/10"));
    assert!(prompt.contains("Меньше встреч"));
}
