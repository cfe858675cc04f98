//! Admin clients listing.
//!
//! Lists company accounts for back-office use. Requires an admin profile
//! with the `canView` permission; company accounts get 403.

use axum::{Json, extract::State, response::IntoResponse};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::auth::RequireAuth;
use crate::services::session::AccountService;
use crate::state::AppState;

/// List all company profiles.
#[instrument(skip(state, user), fields(uid = %user.uid))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let service = AccountService::new(state.identity(), state.store());

    let profile = service
        .fetch_profile(&user.uid)
        .await?
        .ok_or_else(|| AppError::NotFound("profile".to_owned()))?;

    if !profile.can_view_clients() {
        return Err(AppError::Forbidden(
            "admin permission required".to_owned(),
        ));
    }

    let companies = service.list_companies().await?;
    Ok(Json(companies))
}
