//! Plan service layer.
//!
//! Orchestrates creating a plan and claiming it for its owner: the plan row
//! insert and the user's `plan_id` update happen within a single database
//! transaction, so a user can never end up owning half a plan.

use anyhow::{Context, Result, bail};
use sqlx::PgPool;

use pacer_db::models::Plan;
use pacer_db::queries::users as user_db;

/// What creating a plan for a user did.
#[derive(Debug, Clone)]
pub enum CreatePlanOutcome {
    /// The plan was created and linked to the user.
    Created(Plan),
    /// The user already owns a plan; nothing was created.
    AlreadyHasPlan { plan_id: i64 },
}

/// Create a plan with the given daily targets and make `user_id` its owner.
///
/// Each user owns at most one plan. The claim is a guarded update on the
/// user row, so two concurrent creates cannot both succeed: the loser's
/// plan insert is rolled back and the call reports the existing plan.
pub async fn create_plan_for_user(
    pool: &PgPool,
    user_id: i64,
    steps: i32,
    calories: i32,
    sleep: f64,
    water: f64,
) -> Result<CreatePlanOutcome> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let plan = sqlx::query_as::<_, Plan>(
        "INSERT INTO plans (steps, calories, sleep, water) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(steps)
    .bind(calories)
    .bind(sleep)
    .bind(water)
    .fetch_one(&mut *tx)
    .await
    .context("failed to insert plan")?;

    let claimed = sqlx::query("UPDATE users SET plan_id = $1 WHERE id = $2 AND plan_id IS NULL")
        .bind(plan.id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("failed to link plan to user")?
        .rows_affected();

    if claimed == 0 {
        tx.rollback().await.context("failed to roll back")?;

        let user = user_db::get_user(pool, user_id)
            .await?
            .with_context(|| format!("user {user_id} not found"))?;
        match user.plan_id {
            Some(plan_id) => return Ok(CreatePlanOutcome::AlreadyHasPlan { plan_id }),
            None => bail!("user {user_id} changed concurrently"),
        }
    }

    tx.commit().await.context("failed to commit transaction")?;

    tracing::debug!(user_id, plan_id = plan.id, "plan created");
    Ok(CreatePlanOutcome::Created(plan))
}
