//! Authentication route handlers.
//!
//! Registration creates the identity and its profile document, then signs
//! the new account in. Login and logout maintain the cookie session and the
//! Sentry user scope.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::session::{AccountService, RegistrationForm};
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Handle registration.
///
/// The new identity becomes the session's current user, mirroring the
/// provider's own behavior of signing in freshly registered accounts.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<RegistrationForm>,
) -> Result<impl IntoResponse> {
    let service = AccountService::new(state.identity(), state.store());
    let profile = service.register(form).await?;

    let user = CurrentUser {
        uid: profile.uid.clone(),
        email: profile.email.clone(),
        display_name: profile.display_name.clone(),
    };
    if let Err(e) = set_current_user(&session, &user).await {
        tracing::error!("Failed to set session after registration: {e}");
    }
    set_sentry_user(&user.uid, Some(user.email.as_str()));

    Ok((StatusCode::CREATED, Json(profile)))
}

/// Handle login.
#[instrument(skip(state, session, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let service = AccountService::new(state.identity(), state.store());
    let identity = service.login(&request.email, &request.password).await?;

    let user = CurrentUser::from(&identity);
    if let Err(e) = set_current_user(&session, &user).await {
        tracing::error!("Failed to set session after login: {e}");
    }
    set_sentry_user(&user.uid, Some(user.email.as_str()));

    Ok(Json(user))
}

/// Handle logout. Idempotent: logging out twice is fine.
#[instrument(skip(state, session))]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse> {
    let service = AccountService::new(state.identity(), state.store());
    service.logout().await?;

    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session on logout: {e}");
    }
    clear_sentry_user();

    Ok(StatusCode::NO_CONTENT)
}
