//! Cart route handlers.
//!
//! The cart is replaced wholesale on every mutation (last-writer-wins);
//! there is no partial line-item patch. Handlers use `OptionalAuth` and let
//! the workflow enforce the authentication precondition, so unauthenticated
//! calls fail before any store access.

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::auth::OptionalAuth;
use crate::models::CurrentUser;
use crate::services::workflow::{CartWorkflow, LineItemInput};
use crate::state::AppState;

/// Cart replacement request body.
#[derive(Debug, Deserialize)]
pub struct ReplaceCartRequest {
    pub items: Vec<LineItemInput>,
}

/// Current cart, or the canonical empty cart when none is stored.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse> {
    let identity = user.as_ref().map(CurrentUser::identity);
    let workflow = CartWorkflow::new(state.store(), identity.as_ref());
    let cart = workflow.get_cart().await?;
    Ok(Json(cart))
}

/// Replace the cart wholesale with the given items.
#[instrument(skip(state, user, request))]
pub async fn replace(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Json(request): Json<ReplaceCartRequest>,
) -> Result<impl IntoResponse> {
    let identity = user.as_ref().map(CurrentUser::identity);
    let workflow = CartWorkflow::new(state.store(), identity.as_ref());
    let cart = workflow.add_to_cart(request.items).await?;
    Ok(Json(cart))
}

/// Empty the cart. Idempotent.
#[instrument(skip(state, user))]
pub async fn clear(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse> {
    let identity = user.as_ref().map(CurrentUser::identity);
    let workflow = CartWorkflow::new(state.store(), identity.as_ref());
    let cart = workflow.clear_cart().await?;
    Ok(Json(cart))
}
