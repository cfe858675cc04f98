//! Cart/order workflow.
//!
//! The state machine over a single user's shopping state: an empty or
//! populated cart document, and immutable order documents emitted at
//! checkout. Every operation requires an authenticated actor and performs
//! one round-trip per store call; there is no client-side locking - cart
//! writes are last-writer-wins on top of the store's per-document
//! atomicity.
//!
//! # Checkout sequence
//!
//! `place_order` runs an explicit compensating-action sequence instead of a
//! multi-document transaction:
//!
//! 1. create the order document with status `pending`
//! 2. clear the cart
//! 3. patch the order status to `completed`
//!
//! A failure in step 1 leaves the cart untouched and fails the whole
//! operation. A failure in step 2 or 3 is surfaced as
//! [`WorkflowError::PartialCheckout`]; the durable `pending` order remains
//! recoverable by reconciliation.

mod error;

pub use error::{CheckoutStage, WorkflowError};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use marigold_core::{OrderId, ProductId, order_total};

use crate::backend::{
    BackendError, DocumentStore, Filter, Identity, OrderBy, collections,
};
use crate::models::cart::{Cart, LineItem};
use crate::models::order::{Order, PlacedOrder};

/// One line of add-to-cart input; the subtotal is computed, never trusted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInput {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// Checkout input: a caller-generated order id plus the items to snapshot.
#[derive(Debug, Clone)]
pub struct CheckoutInput {
    /// Caller-generated unique order id (see [`OrderId::generate`]).
    pub order_id: OrderId,
    /// Line items at the moment of checkout; must be non-empty.
    pub items: Vec<LineItem>,
    /// The caller's clock at checkout.
    pub client_timestamp: DateTime<Utc>,
}

/// Result of a successful checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub total: Decimal,
}

/// The cart/order workflow, constructed per call.
///
/// `actor` is the identity the operation runs as; `None` makes every
/// operation fail `Unauthenticated` before touching the store.
pub struct CartWorkflow<'a, S> {
    store: &'a S,
    actor: Option<&'a Identity>,
}

impl<'a, S> CartWorkflow<'a, S>
where
    S: DocumentStore,
{
    /// Create a new workflow for one operation.
    #[must_use]
    pub const fn new(store: &'a S, actor: Option<&'a Identity>) -> Self {
        Self { store, actor }
    }

    fn require_actor(&self) -> Result<&'a Identity, WorkflowError> {
        self.actor.ok_or(WorkflowError::Unauthenticated)
    }

    /// Replace the actor's cart wholesale with the given items.
    ///
    /// Last-writer-wins: concurrent calls from multiple sessions of the
    /// same user are not merged; the last write fully overwrites. The total
    /// and each subtotal are recomputed here, never taken from the caller.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without an actor; `InvalidInput` for an empty item
    /// list, a zero quantity, or a negative unit price (all checked before
    /// any write); `Backend` for store failures.
    #[instrument(skip(self, items))]
    pub async fn add_to_cart(&self, items: Vec<LineItemInput>) -> Result<Cart, WorkflowError> {
        let actor = self.require_actor()?;

        if items.is_empty() {
            return Err(WorkflowError::InvalidInput(
                "at least one item is required".to_owned(),
            ));
        }

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            validate_line(item.quantity, item.unit_price)?;
            lines.push(LineItem::new(
                item.product_id,
                item.product_name,
                item.quantity,
                item.unit_price,
            ));
        }

        let cart = Cart::from_items(lines, Utc::now());
        self.write_cart(actor, &cart).await?;

        tracing::info!(
            uid = %actor.uid,
            items = cart.items.len(),
            total = %cart.total,
            "cart replaced"
        );
        Ok(cart)
    }

    /// The actor's stored cart, or the canonical empty cart when no
    /// document exists yet.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without an actor; `Backend` for store failures.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> Result<Cart, WorkflowError> {
        let actor = self.require_actor()?;

        match self
            .store
            .read_by_key(collections::CARTS, actor.uid.as_str())
            .await?
        {
            None => Ok(Cart::empty()),
            Some(document) => {
                let cart = serde_json::from_value(document).map_err(BackendError::Parse)?;
                Ok(cart)
            }
        }
    }

    /// Empty the actor's cart (items `[]`, total `0`). Idempotent; the cart
    /// document is emptied, never deleted.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without an actor; `Backend` for store failures.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<Cart, WorkflowError> {
        let actor = self.require_actor()?;

        let cart = Cart {
            updated_at: Some(Utc::now()),
            ..Cart::empty()
        };
        self.write_cart(actor, &cart).await?;

        tracing::info!(uid = %actor.uid, "cart cleared");
        Ok(cart)
    }

    /// Place an order from the given checkout input, then empty the cart.
    ///
    /// See the module docs for the checkout sequence and its failure
    /// semantics.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without an actor; `EmptyCart` when the input has
    /// no items (rejected before any write); `InvalidInput` for malformed
    /// items; `PartialCheckout` when the order was written but a later step
    /// failed; `Backend` when the order write itself fails (cart untouched).
    #[instrument(skip(self, input), fields(order_id = %input.order_id))]
    pub async fn place_order(&self, input: CheckoutInput) -> Result<OrderReceipt, WorkflowError> {
        let actor = self.require_actor()?;

        if input.items.is_empty() {
            return Err(WorkflowError::EmptyCart);
        }

        // Rebuild every line so subtotals and the total always satisfy the
        // totals invariant regardless of what the caller sent.
        let mut items = Vec::with_capacity(input.items.len());
        for line in input.items {
            validate_line(line.quantity, line.unit_price)?;
            items.push(LineItem::new(
                line.product_id,
                line.product_name,
                line.quantity,
                line.unit_price,
            ));
        }
        let total = order_total(items.iter().map(|item| item.subtotal));

        let order = Order::pending(actor, items, total, input.client_timestamp);
        let document = serde_json::to_value(&order).map_err(BackendError::Parse)?;

        // Step 1: durable order create. On failure the cart is untouched.
        self.store
            .create_or_replace(collections::ORDERS, input.order_id.as_str(), document)
            .await?;

        // Step 2: clear the cart.
        let empty = Cart {
            updated_at: Some(Utc::now()),
            ..Cart::empty()
        };
        if let Err(source) = self.write_cart(actor, &empty).await {
            tracing::error!(
                order_id = %input.order_id,
                uid = %actor.uid,
                error = %source,
                "order recorded but cart clear failed; order left pending"
            );
            return Err(WorkflowError::PartialCheckout {
                order_id: input.order_id,
                stage: CheckoutStage::ClearCart,
                source,
            });
        }

        // Step 3: mark the order completed.
        if let Err(source) = self
            .store
            .merge_patch(
                collections::ORDERS,
                input.order_id.as_str(),
                json!({"status": "completed"}),
            )
            .await
        {
            tracing::error!(
                order_id = %input.order_id,
                uid = %actor.uid,
                error = %source,
                "order recorded but status update failed; order left pending"
            );
            return Err(WorkflowError::PartialCheckout {
                order_id: input.order_id,
                stage: CheckoutStage::MarkCompleted,
                source,
            });
        }

        tracing::info!(
            order_id = %input.order_id,
            uid = %actor.uid,
            total = %total,
            "order placed"
        );
        Ok(OrderReceipt {
            order_id: input.order_id,
            total,
        })
    }

    /// All of the actor's orders, newest first.
    ///
    /// Full scan per call - there is no pagination; acceptable while
    /// per-user order counts stay small.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without an actor; `Backend` for store failures.
    #[instrument(skip(self))]
    pub async fn get_user_orders(&self) -> Result<Vec<PlacedOrder>, WorkflowError> {
        let actor = self.require_actor()?;

        let documents = self
            .store
            .query(
                collections::ORDERS,
                &[Filter::equals("userId", actor.uid.as_str())],
                Some(&OrderBy::descending("createdAt")),
            )
            .await?;

        documents
            .into_iter()
            .map(|doc| {
                let order = serde_json::from_value(doc.data).map_err(BackendError::Parse)?;
                Ok(PlacedOrder {
                    id: OrderId::new(doc.key),
                    order,
                })
            })
            .collect()
    }

    async fn write_cart(&self, actor: &Identity, cart: &Cart) -> Result<(), BackendError> {
        let document = serde_json::to_value(cart).map_err(BackendError::Parse)?;
        self.store
            .create_or_replace(collections::CARTS, actor.uid.as_str(), document)
            .await?;
        Ok(())
    }
}

fn validate_line(quantity: u32, unit_price: Decimal) -> Result<(), WorkflowError> {
    if quantity == 0 {
        return Err(WorkflowError::InvalidInput(
            "quantity must be at least 1".to_owned(),
        ));
    }
    if unit_price.is_sign_negative() {
        return Err(WorkflowError::InvalidInput(
            "unit price cannot be negative".to_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marigold_core::{Email, UserId};

    use crate::backend::MemoryBackend;

    use super::*;

    fn actor() -> Identity {
        Identity {
            uid: UserId::new("u-1"),
            email: Email::parse("ana@firma.ro").unwrap(),
            display_name: None,
        }
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_operations_require_authentication() {
        let backend = MemoryBackend::new();
        let store = backend.store();
        let workflow = CartWorkflow::new(&store, None);

        assert!(matches!(
            workflow.get_cart().await,
            Err(WorkflowError::Unauthenticated)
        ));
        assert!(matches!(
            workflow.add_to_cart(vec![]).await,
            Err(WorkflowError::Unauthenticated)
        ));
        assert!(matches!(
            workflow.clear_cart().await,
            Err(WorkflowError::Unauthenticated)
        ));
        assert!(matches!(
            workflow.get_user_orders().await,
            Err(WorkflowError::Unauthenticated)
        ));

        // No writes reached the store.
        let carts = store
            .query(collections::CARTS, &[], None)
            .await
            .unwrap();
        assert!(carts.is_empty());
    }

    #[tokio::test]
    async fn test_add_to_cart_rejects_bad_lines() {
        let backend = MemoryBackend::new();
        let store = backend.store();
        let identity = actor();
        let workflow = CartWorkflow::new(&store, Some(&identity));

        assert!(matches!(
            workflow.add_to_cart(vec![]).await,
            Err(WorkflowError::InvalidInput(_))
        ));

        let zero_quantity = vec![LineItemInput {
            product_id: ProductId::new(1),
            product_name: "Wireless Headphones".to_owned(),
            quantity: 0,
            unit_price: dec("99.99"),
        }];
        assert!(matches!(
            workflow.add_to_cart(zero_quantity).await,
            Err(WorkflowError::InvalidInput(_))
        ));

        let negative_price = vec![LineItemInput {
            product_id: ProductId::new(1),
            product_name: "Wireless Headphones".to_owned(),
            quantity: 1,
            unit_price: dec("-1"),
        }];
        assert!(matches!(
            workflow.add_to_cart(negative_price).await,
            Err(WorkflowError::InvalidInput(_))
        ));

        // Rejections happen before any write.
        assert!(
            store
                .read_by_key(collections::CARTS, "u-1")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_place_order_rejects_empty_before_write() {
        let backend = MemoryBackend::new();
        let store = backend.store();
        let identity = actor();
        let workflow = CartWorkflow::new(&store, Some(&identity));

        let input = CheckoutInput {
            order_id: OrderId::new("ORD-EMPTY"),
            items: vec![],
            client_timestamp: Utc::now(),
        };
        assert!(matches!(
            workflow.place_order(input).await,
            Err(WorkflowError::EmptyCart)
        ));
        assert!(
            store
                .read_by_key(collections::ORDERS, "ORD-EMPTY")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_place_order_recomputes_total() {
        let backend = MemoryBackend::new();
        let store = backend.store();
        let identity = actor();
        let workflow = CartWorkflow::new(&store, Some(&identity));

        // Tampered subtotal: the workflow must not trust it.
        let mut tampered = LineItem::new(ProductId::new(1), "Wireless Headphones", 2, dec("99.99"));
        tampered.subtotal = dec("1.00");

        let receipt = workflow
            .place_order(CheckoutInput {
                order_id: OrderId::new("ORD-RECOMPUTE"),
                items: vec![tampered],
                client_timestamp: Utc::now(),
            })
            .await
            .unwrap();

        assert_eq!(receipt.total, dec("199.98"));
    }
}
