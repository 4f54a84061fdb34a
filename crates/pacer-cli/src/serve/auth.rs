//! Bearer-token authentication.
//!
//! Every route resolves the caller through [`CurrentUser`]: the extractor
//! verifies the token's HMAC against the configured secret and loads the
//! user row, so handlers receive caller identity as an explicit value.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use pacer_db::models::{Plan, User};
use pacer_db::queries::{plans as plan_db, users as user_db};

use super::{AppError, AppState};

/// The authenticated caller.
pub struct CurrentUser(pub User);

impl CurrentUser {
    /// The caller's plan, or a 404 if they have not created one yet.
    pub async fn plan(&self, state: &AppState) -> Result<Plan, AppError> {
        let plan_id = self
            .0
            .plan_id
            .ok_or_else(|| AppError::not_found("you have no plan yet"))?;
        plan_db::get_plan(&state.pool, plan_id)
            .await
            .map_err(AppError::internal)?
            .ok_or_else(|| AppError::not_found(format!("plan {plan_id} not found")))
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;

        let user_id = state
            .tokens
            .verify(token)
            .map_err(|e| AppError::unauthorized(format!("invalid token: {e}")))?;

        let user = user_db::get_user(&state.pool, user_id)
            .await
            .map_err(AppError::internal)?
            .ok_or_else(|| {
                AppError::unauthorized(format!("token user {user_id} no longer exists"))
            })?;

        Ok(CurrentUser(user))
    }
}
