//! The `pacer serve` HTTP API.
//!
//! Routes are grouped one module per resource family: plan CRUD and the
//! task-attempt endpoints in [`plans`], activity logging and daily reads
//! in [`activities`], roster and catalog reads in [`tasks`]. Every route
//! authenticates the caller via the bearer-token extractor in [`auth`].

use std::net::SocketAddr;

use anyhow::Result;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;

use pacer_core::token::TokenSigner;

pub mod activities;
pub mod auth;
pub mod plans;
pub mod tasks;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// State shared by every handler: the connection pool and the signer used
/// to verify caller tokens.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub tokens: TokenSigner,
}

// ---------------------------------------------------------------------------
// Error envelope
// ---------------------------------------------------------------------------

/// What a failed handler sends back: an HTTP status and a JSON body of the
/// shape `{"error": "..."}`.
pub struct AppError(StatusCode, String);

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(StatusCode::NOT_FOUND, msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self(StatusCode::UNAUTHORIZED, msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self(StatusCode::CONFLICT, msg.into())
    }

    pub fn internal(err: anyhow::Error) -> Self {
        tracing::error!("request failed: {err:#}");
        Self(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let AppError(status, message) = self;
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/plans", get(plans::list_plans).post(plans::create_plan))
        .route("/plans/change", patch(plans::change_plan))
        .route("/plans/sleep", post(activities::log_sleep))
        .route("/plans/water", post(activities::log_water))
        .route("/plans/food", post(activities::log_food))
        .route("/plans/step", post(activities::log_step))
        .route("/plans/calories", get(activities::today_calories))
        .route("/plans/steps", get(activities::today_steps))
        .route("/plans/tasks", get(tasks::my_tasks))
        .route("/plans/stop-task", put(plans::stop_task))
        .route("/plans/continue-task", put(plans::continue_task))
        .route("/plans/cancel-task", put(plans::cancel_task))
        .route(
            "/plans/{id}",
            get(plans::get_plan)
                .put(plans::update_plan)
                .patch(plans::patch_plan)
                .delete(plans::delete_plan),
        )
        .route("/plans/{id}/delete-food", delete(activities::delete_food))
        .route("/plans/{id}/add-to-tasks", post(tasks::add_to_tasks))
        .route(
            "/plans/{id}/delete-from-tasks",
            delete(tasks::delete_from_tasks),
        )
        .route("/plans/{id}/start-task", put(plans::start_task))
        .route("/tasks", get(tasks::list_catalog))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Bind and serve until Ctrl+C.
pub async fn run_serve(pool: PgPool, tokens: TokenSigner, bind: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("pacer API listening on http://{addr}");
    axum::serve(listener, build_router(AppState { pool, tokens }))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Test helpers shared by the handler modules
// ---------------------------------------------------------------------------
