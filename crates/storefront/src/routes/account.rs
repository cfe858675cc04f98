//! Account route handlers.
//!
//! These routes require authentication.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::Value;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::auth::RequireAuth;
use crate::services::session::AccountService;
use crate::state::AppState;

/// Current user's profile document.
#[instrument(skip(state, user), fields(uid = %user.uid))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let service = AccountService::new(state.identity(), state.store());
    let profile = service
        .fetch_profile(&user.uid)
        .await?
        .ok_or_else(|| AppError::NotFound("profile".to_owned()))?;
    Ok(Json(profile))
}

/// Merge-patch the current user's profile.
///
/// The account type is immutable; patches naming `userType` are rejected.
#[instrument(skip(state, user, patch), fields(uid = %user.uid))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(patch): Json<Value>,
) -> Result<impl IntoResponse> {
    let service = AccountService::new(state.identity(), state.store());
    service.update_profile(&user.identity(), patch).await?;
    Ok(StatusCode::NO_CONTENT)
}
