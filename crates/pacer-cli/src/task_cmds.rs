//! Operator CLI handlers for `pacer task` subcommands.
//!
//! Implements:
//! - `pacer task add`    -- create a catalog task
//! - `pacer task list`   -- list the catalog in table format
//! - `pacer task remove` -- delete a catalog task (refused while rostered)

use anyhow::{Context, Result, bail};
use sqlx::PgPool;

use pacer_db::queries::tasks;

use crate::TaskCommands;

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `TaskCommands` variant to the appropriate handler.
pub async fn run_task_command(command: TaskCommands, pool: &PgPool) -> Result<()> {
    match command {
        TaskCommands::Add {
            name,
            description,
            hours,
            minutes,
        } => cmd_add(pool, &name, description.as_deref(), hours, minutes).await,
        TaskCommands::List => cmd_list(pool).await,
        TaskCommands::Remove { task_id } => cmd_remove(pool, task_id).await,
    }
}

/// Format a task duration the way the catalog declares it, e.g. `0h30m`.
fn format_duration(hours: i32, minutes: i32) -> String {
    format!("{hours}h{minutes:02}m")
}

// -----------------------------------------------------------------------
// pacer task add
// -----------------------------------------------------------------------

async fn cmd_add(
    pool: &PgPool,
    name: &str,
    description: Option<&str>,
    hours: i32,
    minutes: i32,
) -> Result<()> {
    if !(0..=59).contains(&minutes) {
        bail!("minutes must be between 0 and 59, got {minutes}");
    }
    if hours < 0 {
        bail!("hours must not be negative, got {hours}");
    }
    if hours == 0 && minutes == 0 {
        bail!("task duration must be longer than zero");
    }

    let task = tasks::insert_task(pool, name, description.unwrap_or(""), hours, minutes)
        .await
        .with_context(|| format!("failed to add task {name:?}"))?;

    println!("Task created:");
    println!("  ID:       {}", task.id);
    println!("  Name:     {}", task.name);
    if !task.description.is_empty() {
        println!("  About:    {}", task.description);
    }
    println!(
        "  Duration: {}",
        format_duration(task.duration_hours, task.duration_minutes)
    );

    Ok(())
}

// -----------------------------------------------------------------------
// pacer task list
// -----------------------------------------------------------------------

async fn cmd_list(pool: &PgPool) -> Result<()> {
    let all = tasks::list_tasks(pool).await?;

    if all.is_empty() {
        println!("No tasks found. Use `pacer task add` to create one.");
        return Ok(());
    }

    // Table format: fixed-width columns.
    let id_w = all
        .iter()
        .map(|t| t.id.to_string().len())
        .max()
        .unwrap_or(2)
        .max(2);
    let name_w = all.iter().map(|t| t.name.len()).max().unwrap_or(4).max(4);

    println!("{:<id_w$}  {:<name_w$}  {:<8}  DESCRIPTION", "ID", "NAME", "DURATION");
    for task in &all {
        println!(
            "{:<id_w$}  {:<name_w$}  {:<8}  {}",
            task.id,
            task.name,
            format_duration(task.duration_hours, task.duration_minutes),
            task.description,
        );
    }

    Ok(())
}

// -----------------------------------------------------------------------
// pacer task remove
// -----------------------------------------------------------------------

async fn cmd_remove(pool: &PgPool, task_id: i64) -> Result<()> {
    tasks::delete_task(pool, task_id).await?;
    println!("Task {task_id} removed from the catalog.");
    Ok(())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
