//! Cart document types.
//!
//! One cart per user, keyed by owner uid in the `carts` collection. The
//! cart is replaced wholesale on every mutation; `total` is recomputed from
//! the line items on each write and never stored stale.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marigold_core::{ProductId, line_subtotal, order_total};

/// One product/quantity/price tuple within a cart or order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    /// Denormalized at add-time.
    pub product_name: String,
    pub quantity: u32,
    /// Denormalized at add-time.
    pub unit_price: Decimal,
    /// `unit_price * quantity`, computed at add-time.
    pub subtotal: Decimal,
}

impl LineItem {
    /// Build a line item, computing the subtotal.
    #[must_use]
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Decimal,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
            subtotal: line_subtotal(unit_price, quantity),
        }
    }
}

/// A cart document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub total: Decimal,
    /// Stamped by the workflow on every mutation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Cart {
    /// The canonical empty cart: `{items: [], total: 0}`.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: Decimal::ZERO,
            updated_at: None,
        }
    }

    /// Build a cart from line items, computing the total.
    #[must_use]
    pub fn from_items(items: Vec<LineItem>, updated_at: DateTime<Utc>) -> Self {
        let total = order_total(items.iter().map(|item| item.subtotal));
        Self {
            items,
            total,
            updated_at: Some(updated_at),
        }
    }

    /// Whether the cart has no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::empty()
    }
}
