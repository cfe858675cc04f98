//! Order document types.
//!
//! One document per order in the `orders` collection, keyed by the
//! client-generated order id. Orders are immutable snapshots: once written,
//! only `status` may change.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marigold_core::{OrderId, OrderStatus, UserId};

use super::cart::LineItem;
use crate::backend::Identity;

/// An order document body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Owner uid; orders are queried by this field.
    pub user_id: UserId,
    /// Denormalized at placement.
    pub user_email: String,
    /// Denormalized at placement; defaults to "User" when the identity has
    /// no display name.
    pub user_display_name: String,
    pub items: Vec<LineItem>,
    pub total: Decimal,
    pub status: OrderStatus,
    /// Stamped by the store at write time; absent until stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// The caller's clock at checkout, kept alongside the server stamp.
    pub client_timestamp: DateTime<Utc>,
}

impl Order {
    /// Build the order snapshot written at checkout.
    ///
    /// `total` must already equal the sum of the items' subtotals; the
    /// workflow recomputes it before calling this.
    #[must_use]
    pub fn pending(
        actor: &Identity,
        items: Vec<LineItem>,
        total: Decimal,
        client_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: actor.uid.clone(),
            user_email: actor.email.to_string(),
            user_display_name: actor
                .display_name
                .clone()
                .unwrap_or_else(|| "User".to_owned()),
            items,
            total,
            status: OrderStatus::Pending,
            created_at: None,
            client_timestamp,
        }
    }
}

/// An order read back from the store, together with its key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedOrder {
    /// The document key (the client-generated order id).
    pub id: OrderId,
    #[serde(flatten)]
    pub order: Order,
}
