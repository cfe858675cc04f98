//! Checkout failure-tail tests.
//!
//! The checkout sequence is create order (pending) -> clear cart -> mark
//! completed, with no transaction across the three writes. These tests
//! inject failures at each step and assert the documented semantics: a
//! failed order create leaves everything untouched; a failure after the
//! order create surfaces as a distinct partial-checkout error with the
//! durable `pending` order left for reconciliation.

use chrono::Utc;
use rust_decimal::Decimal;

use marigold_core::{OrderId, ProductId};
use marigold_integration_tests::{FailNext, FlakyStore, register_actor};
use marigold_storefront::backend::{DocumentStore, MemoryBackend, collections};
use marigold_storefront::services::workflow::{
    CartWorkflow, CheckoutInput, CheckoutStage, LineItemInput, WorkflowError,
};

fn dec(s: &str) -> Decimal {
    s.parse().expect("valid decimal literal")
}

fn line(quantity: u32) -> LineItemInput {
    LineItemInput {
        product_id: ProductId::new(1),
        product_name: "Wireless Headphones".to_owned(),
        quantity,
        unit_price: dec("99.99"),
    }
}

#[tokio::test]
async fn failed_order_create_leaves_cart_untouched() {
    let backend = MemoryBackend::new();
    let store = FlakyStore::new(backend.store());
    let actor = register_actor(&backend, "ana@firma.ro").await;
    let workflow = CartWorkflow::new(&store, Some(&actor));

    workflow
        .add_to_cart(vec![line(2)])
        .await
        .expect("add to cart succeeds");

    store.arm(FailNext::CreateIn(collections::ORDERS));
    let cart = workflow.get_cart().await.expect("get cart succeeds");
    let result = workflow
        .place_order(CheckoutInput {
            order_id: OrderId::new("ORD-FAIL-CREATE"),
            items: cart.items,
            client_timestamp: Utc::now(),
        })
        .await;

    assert!(matches!(result, Err(WorkflowError::Backend(_))));

    // No order document, cart intact.
    assert!(
        store
            .read_by_key(collections::ORDERS, "ORD-FAIL-CREATE")
            .await
            .expect("order read succeeds")
            .is_none()
    );
    let after = workflow.get_cart().await.expect("get cart succeeds");
    assert_eq!(after.items.len(), 1);
    assert_eq!(after.total, dec("199.98"));
}

#[tokio::test]
async fn failed_cart_clear_surfaces_partial_checkout() {
    let backend = MemoryBackend::new();
    let store = FlakyStore::new(backend.store());
    let actor = register_actor(&backend, "ana@firma.ro").await;
    let workflow = CartWorkflow::new(&store, Some(&actor));

    workflow
        .add_to_cart(vec![line(1)])
        .await
        .expect("add to cart succeeds");
    let cart = workflow.get_cart().await.expect("get cart succeeds");

    store.arm(FailNext::CreateIn(collections::CARTS));
    let result = workflow
        .place_order(CheckoutInput {
            order_id: OrderId::new("ORD-PARTIAL-CLEAR"),
            items: cart.items,
            client_timestamp: Utc::now(),
        })
        .await;

    match result {
        Err(WorkflowError::PartialCheckout {
            order_id, stage, ..
        }) => {
            assert_eq!(order_id, OrderId::new("ORD-PARTIAL-CLEAR"));
            assert_eq!(stage, CheckoutStage::ClearCart);
        }
        other => panic!("expected partial checkout, got {other:?}"),
    }

    // The order is durably recorded and still pending.
    let order = store
        .read_by_key(collections::ORDERS, "ORD-PARTIAL-CLEAR")
        .await
        .expect("order read succeeds")
        .expect("order document exists");
    assert_eq!(order["status"], "pending");

    // The cart is stale, not silently cleared.
    let after = workflow.get_cart().await.expect("get cart succeeds");
    assert_eq!(after.items.len(), 1);
}

#[tokio::test]
async fn failed_status_update_surfaces_partial_checkout() {
    let backend = MemoryBackend::new();
    let store = FlakyStore::new(backend.store());
    let actor = register_actor(&backend, "ana@firma.ro").await;
    let workflow = CartWorkflow::new(&store, Some(&actor));

    workflow
        .add_to_cart(vec![line(1)])
        .await
        .expect("add to cart succeeds");
    let cart = workflow.get_cart().await.expect("get cart succeeds");

    store.arm(FailNext::PatchIn(collections::ORDERS));
    let result = workflow
        .place_order(CheckoutInput {
            order_id: OrderId::new("ORD-PARTIAL-STATUS"),
            items: cart.items,
            client_timestamp: Utc::now(),
        })
        .await;

    match result {
        Err(WorkflowError::PartialCheckout { stage, .. }) => {
            assert_eq!(stage, CheckoutStage::MarkCompleted);
        }
        other => panic!("expected partial checkout, got {other:?}"),
    }

    // Order recorded (pending), cart already cleared.
    let order = store
        .read_by_key(collections::ORDERS, "ORD-PARTIAL-STATUS")
        .await
        .expect("order read succeeds")
        .expect("order document exists");
    assert_eq!(order["status"], "pending");

    let after = workflow.get_cart().await.expect("get cart succeeds");
    assert!(after.items.is_empty());
}
