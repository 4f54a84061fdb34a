//! Daily activity logging and today's summary reads.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;

use pacer_db::queries::activities as activity_db;

use super::auth::CurrentUser;
use super::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct SleepBody {
    pub sleep: f64,
}

#[derive(Debug, Deserialize)]
pub struct WaterBody {
    pub water: f64,
}

#[derive(Debug, Deserialize)]
pub struct FoodBody {
    pub food: String,
    pub calories: i32,
}

#[derive(Debug, Deserialize)]
pub struct StepBody {
    pub steps: i32,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

pub async fn log_sleep(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<SleepBody>,
) -> Result<axum::response::Response, AppError> {
    let plan = user.plan(&state).await?;
    activity_db::insert_sleep(&state.pool, plan.id, body.sleep)
        .await
        .map_err(AppError::internal)?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true }))).into_response())
}

pub async fn log_water(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<WaterBody>,
) -> Result<axum::response::Response, AppError> {
    let plan = user.plan(&state).await?;
    activity_db::insert_water(&state.pool, plan.id, body.water)
        .await
        .map_err(AppError::internal)?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true }))).into_response())
}

pub async fn log_food(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<FoodBody>,
) -> Result<axum::response::Response, AppError> {
    let plan = user.plan(&state).await?;
    activity_db::insert_food(&state.pool, plan.id, &body.food, body.calories)
        .await
        .map_err(AppError::internal)?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true }))).into_response())
}

pub async fn log_step(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<StepBody>,
) -> Result<axum::response::Response, AppError> {
    let plan = user.plan(&state).await?;
    activity_db::insert_steps(&state.pool, plan.id, body.steps)
        .await
        .map_err(AppError::internal)?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true }))).into_response())
}

// ---------------------------------------------------------------------------
// Today's summaries
// ---------------------------------------------------------------------------

/// `GET /plans/calories`: today's food entries, newest first, plus their
/// calorie total computed by a SQL aggregate over the same filter.
pub async fn today_calories(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<axum::response::Response, AppError> {
    let plan = user.plan(&state).await?;
    let foods = activity_db::list_today_foods(&state.pool, plan.id)
        .await
        .map_err(AppError::internal)?;
    let all_calories = activity_db::today_calorie_total(&state.pool, plan.id)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(json!({ "all_calories": all_calories, "foods": foods })).into_response())
}

/// `GET /plans/steps`: same shape for step entries.
pub async fn today_steps(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<axum::response::Response, AppError> {
    let plan = user.plan(&state).await?;
    let steps = activity_db::list_today_steps(&state.pool, plan.id)
        .await
        .map_err(AppError::internal)?;
    let all_steps = activity_db::today_step_total(&state.pool, plan.id)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(json!({ "all_steps": all_steps, "steps": steps })).into_response())
}

// ---------------------------------------------------------------------------
// Food deletion
// ---------------------------------------------------------------------------

/// `DELETE /plans/{id}/delete-food`: remove one food entry by id. Scoped to
/// the caller's plan, so another user's entries 404 rather than vanish.
pub async fn delete_food(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(food_id): Path<i64>,
) -> Result<axum::response::Response, AppError> {
    let plan = user.plan(&state).await?;
    let deleted = activity_db::delete_food(&state.pool, plan.id, food_id)
        .await
        .map_err(AppError::internal)?;
    if deleted == 0 {
        return Err(AppError::not_found(format!(
            "food entry {food_id} not found"
        )));
    }
    Ok(Json(json!({ "success": true })).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
