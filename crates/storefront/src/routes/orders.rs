//! Order route handlers.
//!
//! Checkout reads the stored cart server-side, snapshots it into an
//! immutable order, and empties the cart. The order id is generated here
//! (the caller of the workflow), as the workflow contract requires.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use marigold_core::OrderId;

use crate::error::Result;
use crate::middleware::auth::OptionalAuth;
use crate::models::CurrentUser;
use crate::services::workflow::{CartWorkflow, CheckoutInput, OrderReceipt};
use crate::state::AppState;

/// Checkout response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub success: bool,
    pub message: String,
    pub order_id: OrderId,
    pub total: rust_decimal::Decimal,
}

impl From<OrderReceipt> for CheckoutResponse {
    fn from(receipt: OrderReceipt) -> Self {
        Self {
            success: true,
            message: "Order placed successfully!".to_owned(),
            order_id: receipt.order_id,
            total: receipt.total,
        }
    }
}

/// Place an order from the current cart.
#[instrument(skip(state, user))]
pub async fn checkout(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse> {
    let identity = user.as_ref().map(CurrentUser::identity);
    let workflow = CartWorkflow::new(state.store(), identity.as_ref());

    let cart = workflow.get_cart().await?;
    let receipt = workflow
        .place_order(CheckoutInput {
            order_id: OrderId::generate(),
            items: cart.items,
            client_timestamp: Utc::now(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(CheckoutResponse::from(receipt))))
}

/// The current user's order history, newest first.
#[instrument(skip(state, user))]
pub async fn history(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse> {
    let identity = user.as_ref().map(CurrentUser::identity);
    let workflow = CartWorkflow::new(state.store(), identity.as_ref());
    let orders = workflow.get_user_orders().await?;
    Ok(Json(orders))
}
