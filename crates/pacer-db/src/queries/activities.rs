//! Database query functions for the activity log tables.
//!
//! Each log row is append-only and scoped to a plan. The "today" readers
//! filter on the row's creation date in the database's time zone, matching
//! what the daily summary endpoints report.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::{ActivityFood, ActivitySleep, ActivityStep, ActivityWater};

/// Log a sleep entry (hours slept) against a plan.
pub async fn insert_sleep(pool: &PgPool, plan_id: i64, sleep: f64) -> Result<ActivitySleep> {
    let entry = sqlx::query_as::<_, ActivitySleep>(
        "INSERT INTO activity_sleep (plan_id, sleep) VALUES ($1, $2) RETURNING *",
    )
    .bind(plan_id)
    .bind(sleep)
    .fetch_one(pool)
    .await
    .context("failed to insert sleep entry")?;

    Ok(entry)
}

/// Log a water entry (liters drunk) against a plan.
pub async fn insert_water(pool: &PgPool, plan_id: i64, water: f64) -> Result<ActivityWater> {
    let entry = sqlx::query_as::<_, ActivityWater>(
        "INSERT INTO activity_water (plan_id, water) VALUES ($1, $2) RETURNING *",
    )
    .bind(plan_id)
    .bind(water)
    .fetch_one(pool)
    .await
    .context("failed to insert water entry")?;

    Ok(entry)
}

/// Log a food entry with its calorie count against a plan.
pub async fn insert_food(
    pool: &PgPool,
    plan_id: i64,
    food: &str,
    calories: i32,
) -> Result<ActivityFood> {
    let entry = sqlx::query_as::<_, ActivityFood>(
        "INSERT INTO activity_food (plan_id, food, calories) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(plan_id)
    .bind(food)
    .bind(calories)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert food entry {food:?}"))?;

    Ok(entry)
}

/// Log a step-count entry against a plan.
pub async fn insert_steps(pool: &PgPool, plan_id: i64, steps: i32) -> Result<ActivityStep> {
    let entry = sqlx::query_as::<_, ActivityStep>(
        "INSERT INTO activity_steps (plan_id, steps) VALUES ($1, $2) RETURNING *",
    )
    .bind(plan_id)
    .bind(steps)
    .fetch_one(pool)
    .await
    .context("failed to insert steps entry")?;

    Ok(entry)
}

// -----------------------------------------------------------------------
// Daily readers
// -----------------------------------------------------------------------

/// List today's food entries for a plan, newest first.
pub async fn list_today_foods(pool: &PgPool, plan_id: i64) -> Result<Vec<ActivityFood>> {
    let entries = sqlx::query_as::<_, ActivityFood>(
        "SELECT * FROM activity_food \
         WHERE plan_id = $1 AND created_at::date = CURRENT_DATE \
         ORDER BY id DESC",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await
    .context("failed to list today's food entries")?;

    Ok(entries)
}

/// List today's step entries for a plan, newest first.
pub async fn list_today_steps(pool: &PgPool, plan_id: i64) -> Result<Vec<ActivityStep>> {
    let entries = sqlx::query_as::<_, ActivityStep>(
        "SELECT * FROM activity_steps \
         WHERE plan_id = $1 AND created_at::date = CURRENT_DATE \
         ORDER BY id DESC",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await
    .context("failed to list today's step entries")?;

    Ok(entries)
}

/// Sum the calories of today's food entries for a plan. Zero when nothing
/// was logged today.
pub async fn today_calorie_total(pool: &PgPool, plan_id: i64) -> Result<i64> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(calories), 0) FROM activity_food \
         WHERE plan_id = $1 AND created_at::date = CURRENT_DATE",
    )
    .bind(plan_id)
    .fetch_one(pool)
    .await
    .context("failed to total today's calories")?;

    Ok(total)
}

/// Sum today's step entries for a plan. Zero when nothing was logged today.
pub async fn today_step_total(pool: &PgPool, plan_id: i64) -> Result<i64> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(steps), 0) FROM activity_steps \
         WHERE plan_id = $1 AND created_at::date = CURRENT_DATE",
    )
    .bind(plan_id)
    .fetch_one(pool)
    .await
    .context("failed to total today's steps")?;

    Ok(total)
}

/// Delete a food entry, scoped to the given plan so a caller can only
/// remove their own rows. Returns the number of rows removed.
pub async fn delete_food(pool: &PgPool, plan_id: i64, food_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM activity_food WHERE id = $1 AND plan_id = $2")
        .bind(food_id)
        .bind(plan_id)
        .execute(pool)
        .await
        .context("failed to delete food entry")?;

    Ok(result.rows_affected())
}
