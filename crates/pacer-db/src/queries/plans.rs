//! Database query functions for the `plans` table, including the guarded
//! task-attempt column transitions.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::Plan;

/// Insert a new plan row. Returns the inserted plan with server-generated
/// defaults (id, created_at, idle attempt columns).
pub async fn insert_plan(
    pool: &PgPool,
    steps: i32,
    calories: i32,
    sleep: f64,
    water: f64,
) -> Result<Plan> {
    let plan = sqlx::query_as::<_, Plan>(
        "INSERT INTO plans (steps, calories, sleep, water) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(steps)
    .bind(calories)
    .bind(sleep)
    .bind(water)
    .fetch_one(pool)
    .await
    .context("failed to insert plan")?;

    Ok(plan)
}

/// Fetch a plan by its ID.
pub async fn get_plan(pool: &PgPool, id: i64) -> Result<Option<Plan>> {
    let plan = sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch plan")?;

    Ok(plan)
}

/// List all plans, ordered by id.
pub async fn list_plans(pool: &PgPool) -> Result<Vec<Plan>> {
    let plans = sqlx::query_as::<_, Plan>("SELECT * FROM plans ORDER BY id")
        .fetch_all(pool)
        .await
        .context("failed to list plans")?;

    Ok(plans)
}

/// Overwrite the four target fields of a plan, leaving everything else
/// (attempt columns included) untouched.
///
/// Returns the updated plan, or `None` if the plan does not exist.
pub async fn update_plan_targets(
    pool: &PgPool,
    id: i64,
    steps: i32,
    calories: i32,
    sleep: f64,
    water: f64,
) -> Result<Option<Plan>> {
    let plan = sqlx::query_as::<_, Plan>(
        "UPDATE plans \
         SET steps = $1, calories = $2, sleep = $3, water = $4 \
         WHERE id = $5 \
         RETURNING *",
    )
    .bind(steps)
    .bind(calories)
    .bind(sleep)
    .bind(water)
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("failed to update plan targets")?;

    Ok(plan)
}

/// Delete a plan. Activity logs and roster rows cascade; the owning user's
/// `plan_id` back-reference is set to NULL.
///
/// Returns the number of rows deleted (0 when the plan does not exist).
pub async fn delete_plan(pool: &PgPool, id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM plans WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete plan")?;

    Ok(result.rows_affected())
}

// ---------------------------------------------------------------------------
// Task attempt transitions
// ---------------------------------------------------------------------------
//
// Each write is guarded on the attempt columns the caller observed, so a
// concurrent transition shows up as a zero row count instead of silently
// clobbering state.

/// Start an attempt on an idle plan. Guarded on the plan having no attempt.
pub async fn begin_attempt(
    pool: &PgPool,
    plan_id: i64,
    task_id: i64,
    started_at: DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE plans \
         SET started_task_id = $1, task_started_at = $2, task_ended_at = NULL \
         WHERE id = $3 AND started_task_id IS NULL",
    )
    .bind(task_id)
    .bind(started_at)
    .bind(plan_id)
    .execute(pool)
    .await
    .context("failed to begin task attempt")?;

    Ok(result.rows_affected())
}

/// Record a stop time on a running (or re-stop a paused) attempt. Guarded
/// on the task and start time still matching.
pub async fn pause_attempt(
    pool: &PgPool,
    plan_id: i64,
    task_id: i64,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE plans \
         SET task_ended_at = $1 \
         WHERE id = $2 AND started_task_id = $3 AND task_started_at = $4",
    )
    .bind(ended_at)
    .bind(plan_id)
    .bind(task_id)
    .bind(started_at)
    .execute(pool)
    .await
    .context("failed to pause task attempt")?;

    Ok(result.rows_affected())
}

/// Clear the stop time on a paused attempt, resuming it. Guarded on the
/// attempt actually being paused.
pub async fn resume_attempt(
    pool: &PgPool,
    plan_id: i64,
    task_id: i64,
    started_at: DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE plans \
         SET task_ended_at = NULL \
         WHERE id = $1 AND started_task_id = $2 AND task_started_at = $3 \
           AND task_ended_at IS NOT NULL",
    )
    .bind(plan_id)
    .bind(task_id)
    .bind(started_at)
    .execute(pool)
    .await
    .context("failed to resume task attempt")?;

    Ok(result.rows_affected())
}

/// Unconditionally clear the attempt columns (cancel). Returns the number
/// of plan rows touched (0 when the plan does not exist).
pub async fn clear_attempt(pool: &PgPool, plan_id: i64) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE plans \
         SET started_task_id = NULL, task_started_at = NULL, task_ended_at = NULL \
         WHERE id = $1",
    )
    .bind(plan_id)
    .execute(pool)
    .await
    .context("failed to clear task attempt")?;

    Ok(result.rows_affected())
}

/// Complete an attempt: clear the attempt columns and remove the finished
/// task from the plan's roster in one transaction. Guarded on the task and
/// start time still matching; when the guard misses, nothing is written.
pub async fn complete_attempt(
    pool: &PgPool,
    plan_id: i64,
    task_id: i64,
    started_at: DateTime<Utc>,
) -> Result<u64> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let result = sqlx::query(
        "UPDATE plans \
         SET started_task_id = NULL, task_started_at = NULL, task_ended_at = NULL \
         WHERE id = $1 AND started_task_id = $2 AND task_started_at = $3",
    )
    .bind(plan_id)
    .bind(task_id)
    .bind(started_at)
    .execute(&mut *tx)
    .await
    .context("failed to clear completed attempt")?;

    if result.rows_affected() == 0 {
        tx.rollback()
            .await
            .context("failed to roll back transaction")?;
        return Ok(0);
    }

    sqlx::query("DELETE FROM plan_tasks WHERE plan_id = $1 AND task_id = $2")
        .bind(plan_id)
        .bind(task_id)
        .execute(&mut *tx)
        .await
        .context("failed to remove completed task from roster")?;

    tx.commit().await.context("failed to commit transaction")?;

    Ok(result.rows_affected())
}
