//! Plan CRUD, the restricted "change" operation, and the task-attempt
//! endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;

use pacer_core::attempt::{self, ContinueOutcome, StartOutcome, StopOutcome};
use pacer_core::plan::{CreatePlanOutcome, create_plan_for_user};
use pacer_db::queries::{plans as plan_db, tasks as task_db};

use super::auth::CurrentUser;
use super::{AppError, AppState};

/// The four daily targets, as carried by create, full-update, and "change"
/// bodies. All fields required; a missing one is a deserialization error.
#[derive(Debug, Deserialize)]
pub struct PlanTargets {
    pub steps: i32,
    pub calories: i32,
    pub sleep: f64,
    pub water: f64,
}

/// Partial-update body: absent fields keep their current values.
#[derive(Debug, Deserialize)]
pub struct PlanTargetsPatch {
    pub steps: Option<i32>,
    pub calories: Option<i32>,
    pub sleep: Option<f64>,
    pub water: Option<f64>,
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

pub async fn list_plans(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<axum::response::Response, AppError> {
    let plans = plan_db::list_plans(&state.pool)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(plans).into_response())
}

pub async fn create_plan(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<PlanTargets>,
) -> Result<axum::response::Response, AppError> {
    let outcome = create_plan_for_user(
        &state.pool,
        user.0.id,
        body.steps,
        body.calories,
        body.sleep,
        body.water,
    )
    .await
    .map_err(AppError::internal)?;

    match outcome {
        CreatePlanOutcome::Created(plan) => {
            Ok((StatusCode::CREATED, Json(plan)).into_response())
        }
        CreatePlanOutcome::AlreadyHasPlan { plan_id } => Err(AppError::conflict(format!(
            "you already have plan {plan_id}"
        ))),
    }
}

pub async fn get_plan(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<axum::response::Response, AppError> {
    let plan = plan_db::get_plan(&state.pool, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("plan {id} not found")))?;
    Ok(Json(plan).into_response())
}

pub async fn update_plan(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<PlanTargets>,
) -> Result<axum::response::Response, AppError> {
    let plan = plan_db::update_plan_targets(
        &state.pool,
        id,
        body.steps,
        body.calories,
        body.sleep,
        body.water,
    )
    .await
    .map_err(AppError::internal)?
    .ok_or_else(|| AppError::not_found(format!("plan {id} not found")))?;
    Ok(Json(plan).into_response())
}

pub async fn patch_plan(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<PlanTargetsPatch>,
) -> Result<axum::response::Response, AppError> {
    let current = plan_db::get_plan(&state.pool, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("plan {id} not found")))?;

    let plan = plan_db::update_plan_targets(
        &state.pool,
        id,
        body.steps.unwrap_or(current.steps),
        body.calories.unwrap_or(current.calories),
        body.sleep.unwrap_or(current.sleep),
        body.water.unwrap_or(current.water),
    )
    .await
    .map_err(AppError::internal)?
    .ok_or_else(|| AppError::not_found(format!("plan {id} not found")))?;
    Ok(Json(plan).into_response())
}

pub async fn delete_plan(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<axum::response::Response, AppError> {
    let deleted = plan_db::delete_plan(&state.pool, id)
        .await
        .map_err(AppError::internal)?;
    if deleted == 0 {
        return Err(AppError::not_found(format!("plan {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// `PATCH /plans/change`: overwrite the caller's own plan's four targets.
pub async fn change_plan(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<PlanTargets>,
) -> Result<axum::response::Response, AppError> {
    let plan = user.plan(&state).await?;

    plan_db::update_plan_targets(
        &state.pool,
        plan.id,
        body.steps,
        body.calories,
        body.sleep,
        body.water,
    )
    .await
    .map_err(AppError::internal)?
    .ok_or_else(|| AppError::not_found(format!("plan {} not found", plan.id)))?;

    Ok(Json(json!({ "success": true })).into_response())
}

// ---------------------------------------------------------------------------
// Task attempt
// ---------------------------------------------------------------------------

/// `PUT /plans/{id}/start-task`.
///
/// Unknown task ids are 404s; a known task outside the caller's roster, or
/// an attempt already underway, is an in-band refusal (`success: false`).
pub async fn start_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i64>,
) -> Result<axum::response::Response, AppError> {
    task_db::get_task(&state.pool, task_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("task {task_id} not found")))?;

    let plan = user.plan(&state).await?;
    let outcome = attempt::start_task(&state.pool, &plan, task_id)
        .await
        .map_err(AppError::internal)?;

    let success = matches!(outcome, StartOutcome::Started);
    Ok(Json(json!({ "success": success })).into_response())
}

/// `PUT /plans/stop-task`: replies with a free-text status string.
pub async fn stop_task(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<axum::response::Response, AppError> {
    let plan = user.plan(&state).await?;
    let outcome = attempt::stop_task(&state.pool, &plan)
        .await
        .map_err(AppError::internal)?;

    let message = match outcome {
        StopOutcome::NotStarted => "No one task is started",
        StopOutcome::Stopped => "Task was stopped",
        StopOutcome::Completed => "You finished your task",
    };
    Ok(Json(message).into_response())
}

/// `PUT /plans/continue-task`.
pub async fn continue_task(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<axum::response::Response, AppError> {
    let plan = user.plan(&state).await?;
    let outcome = attempt::continue_task(&state.pool, &plan)
        .await
        .map_err(AppError::internal)?;

    // Only continuing with nothing started is a refusal; a continue that
    // finds no time remaining (or nothing paused) still reports success.
    let success = !matches!(outcome, ContinueOutcome::NotStarted);
    Ok(Json(json!({ "success": success })).into_response())
}

/// `PUT /plans/cancel-task`: unconditional, idempotent.
pub async fn cancel_task(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<axum::response::Response, AppError> {
    let plan = user.plan(&state).await?;
    attempt::cancel_task(&state.pool, &plan)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(json!({ "success": true })).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
