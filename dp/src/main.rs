//! Day Planner CLI entry point

use std::fs;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use daystore::{Goal, GoalUpdate, Habit, NewGoal, NewHabit, NewTask, PlanView, Reflection, Stats, Task};
use dayplanner::cli::{
    Cli, Command, GoalCommand, HabitCommand, OutputFormat, PlanCommand, ReflectArgs, ReflectionCommand, TaskCommand,
    get_log_path,
};
use dayplanner::config::Config;
use dayplanner::llm::create_client;
use dayplanner::planner::{DayPlanner, DayReview, GenerationOutcome, GenerationRequest, ReflectionOutcome};
use dayplanner::prompts::PromptLoader;
use dayplanner::state::StateManager;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Logging isn't initialized yet, so nothing here can log
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Priority: CLI > config > INFO default
    let level = match cli_log_level.or(config_log_level).map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(model = %config.llm.model, db = %config.storage.db_path.display(), "Day planner loaded config");

    let state = StateManager::spawn(&config.storage.db_path)
        .with_context(|| format!("Failed to open database {}", config.storage.db_path.display()))?;
    let prompts = PromptLoader::new(config.prompts.dir.as_deref()).context("Failed to load prompt templates")?;
    let llm = create_client(&config.llm).context("Failed to create LLM client")?;
    let planner = DayPlanner::new(state.clone(), llm, Arc::new(prompts), &config.llm);

    let format = cli.format;
    debug!(command = ?cli.command, "main: dispatching command");
    let result = match cli.command {
        Command::Plan { command } => cmd_plan(&planner, command, format).await,
        Command::Task { command } => cmd_task(&state, command, format).await,
        Command::Goal { command } => cmd_goal(&state, command, format).await,
        Command::Habit { command } => cmd_habit(&state, command, format).await,
        Command::Reflect(args) => cmd_reflect(&planner, args, format).await,
        Command::Reflection {
            command: ReflectionCommand::Show { date },
        } => cmd_reflection_show(&state, date, format).await,
        Command::Stats => cmd_stats(&state, format).await,
    };

    state.shutdown().await.ok();
    result
}

/// Print `value` as pretty JSON, or run `text` for human output
fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce(&T)) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(value),
    }
    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// === Plans ===

async fn cmd_plan(planner: &DayPlanner, command: PlanCommand, format: OutputFormat) -> Result<()> {
    debug!(?command, "cmd_plan: called");
    match command {
        PlanCommand::Generate { date, focus, energy } => {
            let request = GenerationRequest::new(date).with_focus(focus).with_energy(energy);
            let outcome = planner.generate_plan(request).await?;
            emit(format, &outcome, print_outcome)
        }
        PlanCommand::Show { date } => {
            let view = planner.state().get_plan_required(date).await?;
            emit(format, &view, print_plan)
        }
        PlanCommand::List { limit } => {
            let views = planner.state().list_plans(limit).await?;
            emit(format, &views, |views| {
                if views.is_empty() {
                    println!("No plans yet. Run `dp plan generate` to create one.");
                }
                for view in views {
                    print_plan_line(view);
                }
            })
        }
        PlanCommand::Rm { date } => {
            planner.state().delete_plan(date).await?;
            emit(format, &serde_json::json!({ "ok": true, "date": date }), |_| {
                println!("Deleted plan for {}", date)
            })
        }
    }
}

fn print_outcome(outcome: &GenerationOutcome) {
    println!(
        "{} plan for {} (plan #{}, {} tasks)",
        "Generated".green().bold(),
        outcome.date,
        outcome.plan_id,
        outcome.tasks_created
    );
    if !outcome.big_three.is_empty() {
        println!();
        println!("{}", "Big 3".bold());
        for (i, item) in outcome.big_three.iter().enumerate() {
            println!("  {}. {}", i + 1, item);
        }
    }
    if !outcome.daily_tip.is_empty() {
        println!();
        println!("{} {}", "Tip:".yellow(), outcome.daily_tip);
    }
    if !outcome.evening_routine.is_empty() {
        println!("{} {}", "Evening:".yellow(), outcome.evening_routine);
    }
}

fn print_plan_line(view: &PlanView) {
    let done = view.tasks.iter().filter(|t| t.is_completed).count();
    println!(
        "{}  {:>3}%  {}/{} tasks  {}",
        view.plan.date.to_string().bold(),
        view.progress,
        done,
        view.tasks.len(),
        view.plan.focus
    );
}

fn print_plan(view: &PlanView) {
    print_plan_line(view);
    println!("Energy: {}/10", view.plan.energy_level);
    println!();
    for task in &view.tasks {
        print_task(task);
    }
}

fn print_task(task: &Task) {
    let check = if task.is_completed { "[x]".green() } else { "[ ]".normal() };
    let origin = if task.origin.is_ai() { "" } else { " (manual)" };
    let slot = if task.time_slot.is_empty() { "-" } else { task.time_slot.as_str() };
    println!(
        "{} {:>5} {:<11} {:<10} {} [{}m, {}]{}",
        check,
        format!("#{}", task.id).dimmed(),
        slot,
        task.category,
        task.title,
        task.duration_min,
        task.priority,
        origin
    );
    if !task.description.is_empty() {
        println!("      {}", task.description.dimmed());
    }
}

// === Tasks ===

async fn cmd_task(state: &StateManager, command: TaskCommand, format: OutputFormat) -> Result<()> {
    debug!(?command, "cmd_task: called");
    match command {
        TaskCommand::Add {
            date,
            title,
            category,
            description,
            time_slot,
            duration,
            priority,
        } => {
            let task = NewTask {
                category,
                title,
                description,
                time_slot,
                duration_min: duration,
                priority,
            };
            let task = state.add_manual_task(date, task).await?;
            emit(format, &task, print_task)
        }
        TaskCommand::Done { id, undo } => {
            let task = state.set_task_completed(id, !undo).await?;
            emit(format, &task, print_task)
        }
        TaskCommand::Rm { id } => {
            state.delete_task(id).await?;
            emit(format, &serde_json::json!({ "ok": true, "id": id }), |_| {
                println!("Deleted task #{}", id)
            })
        }
    }
}

// === Goals ===

async fn cmd_goal(state: &StateManager, command: GoalCommand, format: OutputFormat) -> Result<()> {
    debug!(?command, "cmd_goal: called");
    match command {
        GoalCommand::Add {
            title,
            category,
            description,
            target_date,
        } => {
            let goal = state
                .create_goal(NewGoal {
                    category: category.to_string(),
                    title,
                    description,
                    target_date,
                })
                .await?;
            emit(format, &goal, print_goal)
        }
        GoalCommand::List { all } => {
            let goals = state.list_goals(!all).await?;
            emit(format, &goals, |goals| goals.iter().for_each(print_goal))
        }
        GoalCommand::Update {
            id,
            title,
            description,
            progress,
            active,
        } => {
            let update = GoalUpdate {
                title,
                description,
                progress,
                is_active: active,
            };
            if update.is_empty() {
                eyre::bail!("Nothing to update: pass --title, --description, --progress or --active");
            }
            let goal = state.update_goal(id, update).await?;
            emit(format, &goal, print_goal)
        }
        GoalCommand::Rm { id } => {
            state.delete_goal(id).await?;
            emit(format, &serde_json::json!({ "ok": true, "id": id }), |_| {
                println!("Deleted goal #{}", id)
            })
        }
    }
}

fn print_goal(goal: &Goal) {
    let target = goal.target_date.map(|d| format!(" by {}", d)).unwrap_or_default();
    let inactive = if goal.is_active { "" } else { " (inactive)" };
    println!(
        "{:>5} {:<10} {} {:>3}%{}{}",
        format!("#{}", goal.id).dimmed(),
        goal.category,
        goal.title.bold(),
        goal.progress,
        target,
        inactive
    );
}

// === Habits ===

async fn cmd_habit(state: &StateManager, command: HabitCommand, format: OutputFormat) -> Result<()> {
    debug!(?command, "cmd_habit: called");
    match command {
        HabitCommand::Add {
            title,
            category,
            frequency,
        } => {
            let habit = state
                .create_habit(NewHabit {
                    title,
                    category: category.to_string(),
                    frequency,
                })
                .await?;
            emit(format, &habit, print_habit)
        }
        HabitCommand::List { all } => {
            let habits = state.list_habits(!all).await?;
            emit(format, &habits, |habits| habits.iter().for_each(print_habit))
        }
        HabitCommand::Log { id, date, missed } => {
            let habit = state.log_habit(id, date, !missed).await?;
            emit(format, &habit, print_habit)
        }
        HabitCommand::Rm { id } => {
            state.delete_habit(id).await?;
            emit(format, &serde_json::json!({ "ok": true, "id": id }), |_| {
                println!("Deleted habit #{}", id)
            })
        }
    }
}

fn print_habit(habit: &Habit) {
    println!(
        "{:>5} {:<10} {} ({}) streak {} / best {}",
        format!("#{}", habit.id).dimmed(),
        habit.category,
        habit.title.bold(),
        habit.frequency,
        habit.streak.to_string().green(),
        habit.best_streak
    );
}

// === Reflections ===

async fn cmd_reflect(planner: &DayPlanner, args: ReflectArgs, format: OutputFormat) -> Result<()> {
    debug!(date = %args.date, "cmd_reflect: called");
    let review = DayReview {
        date: args.date,
        wins: args.wins,
        lessons: args.lessons,
        mood: args.mood,
        rating: args.rating,
        rituals_done: args.rituals_done,
        rituals_total: args.rituals_total,
        deepwork_hours: args.deepwork_hours,
        calories: args.calories,
        overall_score: args.score,
        notes: args.notes,
    };
    let outcome = planner.save_reflection(review).await?;
    emit(format, &outcome, print_reflection_outcome)
}

fn print_reflection_outcome(outcome: &ReflectionOutcome) {
    println!("{} reflection for {}", "Saved".green().bold(), outcome.date);
    println!("Day score: {}", outcome.analysis.day_score);
    if !outcome.analysis.ai_summary.is_empty() {
        println!();
        println!("{}", outcome.analysis.ai_summary);
    }
    if !outcome.analysis.ai_next_day.is_empty() {
        println!();
        println!("{}", "Tomorrow".bold());
        println!("{}", outcome.analysis.ai_next_day);
    }
}

async fn cmd_reflection_show(state: &StateManager, date: NaiveDate, format: OutputFormat) -> Result<()> {
    debug!(%date, "cmd_reflection_show: called");
    let reflection = state.get_reflection(date).await?;
    emit(format, &reflection, |reflection| match reflection {
        Some(r) => print_reflection(r),
        None => println!("No reflection for {}", date),
    })
}

fn print_reflection(r: &Reflection) {
    println!(
        "{}  mood {}/10  rating {}/5  score {}",
        r.date.to_string().bold(),
        r.mood,
        r.rating,
        r.day_score
    );
    for (label, text) in [
        ("Wins", &r.wins),
        ("Lessons", &r.lessons),
        ("Notes", &r.notes),
        ("Summary", &r.ai_summary),
        ("Tomorrow", &r.ai_next_day),
    ] {
        if !text.is_empty() {
            println!("{}\n{}", label.yellow(), text);
        }
    }
}

// === Stats ===

async fn cmd_stats(state: &StateManager, format: OutputFormat) -> Result<()> {
    debug!("cmd_stats: called");
    let stats = state.stats(today()).await?;
    emit(format, &stats, print_stats)
}

fn print_stats(stats: &Stats) {
    let avg = |v: Option<f64>| v.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".to_string());
    println!("Day Planner Stats");
    println!("-----------------");
    println!("Plans:           {}", stats.total_plans);
    println!(
        "Tasks:           {}/{} ({}%)",
        stats.completed_tasks, stats.total_tasks, stats.completion_rate
    );
    println!("Active goals:    {}", stats.active_goals);
    println!("Active habits:   {}", stats.active_habits);
    println!("Average mood:    {}", avg(stats.avg_mood));
    println!("Average rating:  {}", avg(stats.avg_rating));
    println!("Current streak:  {} days", stats.current_streak.to_string().green());
}
