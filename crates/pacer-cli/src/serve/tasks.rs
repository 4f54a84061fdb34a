//! Roster management and task-catalog reads.

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde_json::json;

use pacer_db::queries::tasks as task_db;

use super::auth::CurrentUser;
use super::{AppError, AppState};

/// `GET /plans/tasks`: the caller's roster, ordered by task id.
pub async fn my_tasks(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<axum::response::Response, AppError> {
    let plan = user.plan(&state).await?;
    let tasks = task_db::list_plan_tasks(&state.pool, plan.id)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(tasks).into_response())
}

/// `GET /tasks`: the full catalog, ordered by id.
pub async fn list_catalog(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<axum::response::Response, AppError> {
    let tasks = task_db::list_tasks(&state.pool)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(tasks).into_response())
}

/// `POST /plans/{id}/add-to-tasks`: attach a catalog task to the caller's
/// roster. Idempotent; unknown task ids are 404s.
pub async fn add_to_tasks(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i64>,
) -> Result<axum::response::Response, AppError> {
    task_db::get_task(&state.pool, task_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("task {task_id} not found")))?;

    let plan = user.plan(&state).await?;
    task_db::add_task_to_plan(&state.pool, plan.id, task_id)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(json!({ "success": true })).into_response())
}

/// `DELETE /plans/{id}/delete-from-tasks`: detach a task from the caller's
/// roster. Detaching a task that is not on the roster is a no-op; detaching
/// the one under attempt also clears the attempt.
pub async fn delete_from_tasks(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i64>,
) -> Result<axum::response::Response, AppError> {
    task_db::get_task(&state.pool, task_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("task {task_id} not found")))?;

    let plan = user.plan(&state).await?;
    task_db::remove_task_from_plan(&state.pool, plan.id, task_id)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(json!({ "success": true })).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
