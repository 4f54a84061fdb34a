//! Database query functions for the `tasks` catalog and the `plan_tasks`
//! roster join table.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::Task;

/// Insert a new catalog task. Returns the inserted task with
/// server-generated defaults (id, created_at).
///
/// The duration must satisfy the table's CHECK constraints: minutes in
/// 0..=59 and a total duration greater than zero.
pub async fn insert_task(
    pool: &PgPool,
    name: &str,
    description: &str,
    duration_hours: i32,
    duration_minutes: i32,
) -> Result<Task> {
    let task = sqlx::query_as::<_, Task>(
        "INSERT INTO tasks (name, description, duration_hours, duration_minutes) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(name)
    .bind(description)
    .bind(duration_hours)
    .bind(duration_minutes)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert task {name:?}"))?;

    Ok(task)
}

/// Fetch a single catalog task by ID.
pub async fn get_task(pool: &PgPool, id: i64) -> Result<Option<Task>> {
    let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch task")?;

    Ok(task)
}

/// List the whole catalog, ordered by id.
pub async fn list_tasks(pool: &PgPool) -> Result<Vec<Task>> {
    let tasks = sqlx::query_as::<_, Task>("SELECT * FROM tasks ORDER BY id")
        .fetch_all(pool)
        .await
        .context("failed to list tasks")?;

    Ok(tasks)
}

/// Delete a catalog task.
///
/// Refused while any plan still has the task in its roster (removing it
/// out from under an active attempt would break the roster-membership
/// invariant).
pub async fn delete_task(pool: &PgPool, id: i64) -> Result<()> {
    let linked: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM plan_tasks WHERE task_id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .context("failed to check task roster links")?;

    if linked.0 > 0 {
        anyhow::bail!(
            "cannot delete task {id}: it is on {} plan roster(s)",
            linked.0,
        );
    }

    let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete task")?;

    if result.rows_affected() == 0 {
        anyhow::bail!("task {id} not found");
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Roster
// -----------------------------------------------------------------------

/// Attach a task to a plan's roster.
///
/// Uses `ON CONFLICT DO NOTHING` so this is idempotent.
pub async fn add_task_to_plan(pool: &PgPool, plan_id: i64, task_id: i64) -> Result<()> {
    sqlx::query(
        "INSERT INTO plan_tasks (plan_id, task_id) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(plan_id)
    .bind(task_id)
    .execute(pool)
    .await
    .context("failed to add task to plan roster")?;

    Ok(())
}

/// Detach a task from a plan's roster.
///
/// When the detached task happens to be the plan's started task, the
/// attempt is cleared in the same transaction so `started_task` can never
/// point outside the roster.
///
/// Returns the number of roster rows removed (0 when the task was not on
/// the roster).
pub async fn remove_task_from_plan(pool: &PgPool, plan_id: i64, task_id: i64) -> Result<u64> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let result = sqlx::query("DELETE FROM plan_tasks WHERE plan_id = $1 AND task_id = $2")
        .bind(plan_id)
        .bind(task_id)
        .execute(&mut *tx)
        .await
        .context("failed to remove task from plan roster")?;

    if result.rows_affected() > 0 {
        sqlx::query(
            "UPDATE plans \
             SET started_task_id = NULL, task_started_at = NULL, task_ended_at = NULL \
             WHERE id = $1 AND started_task_id = $2",
        )
        .bind(plan_id)
        .bind(task_id)
        .execute(&mut *tx)
        .await
        .context("failed to clear attempt for removed roster task")?;
    }

    tx.commit().await.context("failed to commit transaction")?;

    Ok(result.rows_affected())
}

/// List a plan's roster, ordered by task id.
pub async fn list_plan_tasks(pool: &PgPool, plan_id: i64) -> Result<Vec<Task>> {
    let tasks = sqlx::query_as::<_, Task>(
        "SELECT t.* FROM tasks t \
         JOIN plan_tasks pt ON pt.task_id = t.id \
         WHERE pt.plan_id = $1 \
         ORDER BY t.id",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await
    .context("failed to list plan roster")?;

    Ok(tasks)
}

/// Check whether a task is on a plan's roster.
pub async fn plan_has_task(pool: &PgPool, plan_id: i64, task_id: i64) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM plan_tasks WHERE plan_id = $1 AND task_id = $2)",
    )
    .bind(plan_id)
    .bind(task_id)
    .fetch_one(pool)
    .await
    .context("failed to check plan roster membership")?;

    Ok(exists)
}
