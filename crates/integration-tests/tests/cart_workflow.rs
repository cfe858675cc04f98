//! End-to-end cart/order workflow tests against the in-memory backend.

use chrono::Utc;
use rust_decimal::Decimal;

use marigold_core::{OrderId, OrderStatus, ProductId};
use marigold_integration_tests::register_actor;
use marigold_storefront::backend::{DocumentStore, MemoryBackend, collections};
use marigold_storefront::services::workflow::{
    CartWorkflow, CheckoutInput, LineItemInput, WorkflowError,
};

fn dec(s: &str) -> Decimal {
    s.parse().expect("valid decimal literal")
}

fn headphones(quantity: u32) -> LineItemInput {
    LineItemInput {
        product_id: ProductId::new(1),
        product_name: "Wireless Headphones".to_owned(),
        quantity,
        unit_price: dec("99.99"),
    }
}

fn smart_watch(quantity: u32) -> LineItemInput {
    LineItemInput {
        product_id: ProductId::new(2),
        product_name: "Smart Watch".to_owned(),
        quantity,
        unit_price: dec("199.99"),
    }
}

#[tokio::test]
async fn add_then_get_returns_exactly_what_was_written() {
    let backend = MemoryBackend::new();
    let store = backend.store();
    let actor = register_actor(&backend, "ana@firma.ro").await;
    let workflow = CartWorkflow::new(&store, Some(&actor));

    let written = workflow
        .add_to_cart(vec![headphones(2), smart_watch(1)])
        .await
        .expect("add to cart succeeds");

    let read = workflow.get_cart().await.expect("get cart succeeds");
    assert_eq!(read, written);
    assert_eq!(read.items.len(), 2);
    assert_eq!(read.total, dec("399.97"));

    let first = read.items.first().expect("two items");
    assert_eq!(first.subtotal, dec("199.98"));
}

#[tokio::test]
async fn get_cart_without_document_is_canonical_empty() {
    let backend = MemoryBackend::new();
    let store = backend.store();
    let actor = register_actor(&backend, "ana@firma.ro").await;
    let workflow = CartWorkflow::new(&store, Some(&actor));

    let cart = workflow.get_cart().await.expect("get cart succeeds");
    assert!(cart.items.is_empty());
    assert_eq!(cart.total, Decimal::ZERO);
}

#[tokio::test]
async fn clear_cart_is_idempotent() {
    let backend = MemoryBackend::new();
    let store = backend.store();
    let actor = register_actor(&backend, "ana@firma.ro").await;
    let workflow = CartWorkflow::new(&store, Some(&actor));

    workflow
        .add_to_cart(vec![headphones(1)])
        .await
        .expect("add to cart succeeds");

    let once = workflow.clear_cart().await.expect("first clear succeeds");
    let twice = workflow.clear_cart().await.expect("second clear succeeds");
    assert!(once.items.is_empty());
    assert_eq!(once.total, Decimal::ZERO);
    assert_eq!(twice.items, once.items);
    assert_eq!(twice.total, once.total);

    let read = workflow.get_cart().await.expect("get cart succeeds");
    assert!(read.items.is_empty());
    assert_eq!(read.total, Decimal::ZERO);
}

#[tokio::test]
async fn checkout_scenario_records_order_and_empties_cart() {
    let backend = MemoryBackend::new();
    let store = backend.store();
    let actor = register_actor(&backend, "ana@firma.ro").await;
    let workflow = CartWorkflow::new(&store, Some(&actor));

    let cart = workflow
        .add_to_cart(vec![headphones(2), smart_watch(1)])
        .await
        .expect("add to cart succeeds");
    assert_eq!(cart.total, dec("399.97"));

    let receipt = workflow
        .place_order(CheckoutInput {
            order_id: OrderId::new("ORD-TEST-1"),
            items: cart.items,
            client_timestamp: Utc::now(),
        })
        .await
        .expect("checkout succeeds");
    assert_eq!(receipt.order_id, OrderId::new("ORD-TEST-1"));
    assert_eq!(receipt.total, dec("399.97"));

    // The order document holds the submitted items and total, completed.
    let document = store
        .read_by_key(collections::ORDERS, "ORD-TEST-1")
        .await
        .expect("order read succeeds")
        .expect("order document exists");
    assert_eq!(document["userId"], actor.uid.as_str());
    assert_eq!(document["userEmail"], "ana@firma.ro");
    assert_eq!(document["total"], "399.97");
    assert_eq!(document["status"], "completed");
    assert_eq!(document["items"].as_array().map(Vec::len), Some(2));
    assert!(document["createdAt"].is_string());

    // Cart is emptied, not deleted.
    let after = workflow.get_cart().await.expect("get cart succeeds");
    assert!(after.items.is_empty());
    assert_eq!(after.total, Decimal::ZERO);

    // History contains exactly this order.
    let orders = workflow
        .get_user_orders()
        .await
        .expect("order history succeeds");
    assert_eq!(orders.len(), 1);
    let placed = orders.first().expect("one order");
    assert_eq!(placed.id, OrderId::new("ORD-TEST-1"));
    assert_eq!(placed.order.status, OrderStatus::Completed);
    assert_eq!(placed.order.total, dec("399.97"));
}

#[tokio::test]
async fn empty_checkout_rejected_and_history_unchanged() {
    let backend = MemoryBackend::new();
    let store = backend.store();
    let actor = register_actor(&backend, "ana@firma.ro").await;
    let workflow = CartWorkflow::new(&store, Some(&actor));

    let result = workflow
        .place_order(CheckoutInput {
            order_id: OrderId::new("ORD-NOPE"),
            items: vec![],
            client_timestamp: Utc::now(),
        })
        .await;
    assert!(matches!(result, Err(WorkflowError::EmptyCart)));

    let orders = workflow
        .get_user_orders()
        .await
        .expect("order history succeeds");
    assert!(orders.is_empty());
}

#[tokio::test]
async fn order_history_is_newest_first() {
    let backend = MemoryBackend::new();
    let store = backend.store();
    let actor = register_actor(&backend, "ana@firma.ro").await;
    let workflow = CartWorkflow::new(&store, Some(&actor));

    for order_id in ["ORD-OLD", "ORD-NEW"] {
        workflow
            .add_to_cart(vec![headphones(1)])
            .await
            .expect("add to cart succeeds");
        let cart = workflow.get_cart().await.expect("get cart succeeds");
        workflow
            .place_order(CheckoutInput {
                order_id: OrderId::new(order_id),
                items: cart.items,
                client_timestamp: Utc::now(),
            })
            .await
            .expect("checkout succeeds");
        // The memory store stamps createdAt from the wall clock; keep the
        // two orders from landing on the same instant.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let orders = workflow
        .get_user_orders()
        .await
        .expect("order history succeeds");
    let ids: Vec<&str> = orders.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["ORD-NEW", "ORD-OLD"]);
}

#[tokio::test]
async fn concurrent_carts_are_last_writer_wins() {
    let backend = MemoryBackend::new();
    let actor = register_actor(&backend, "ana@firma.ro").await;

    // Two sessions of the same user, each with its own store handle.
    let store_a = backend.store();
    let store_b = backend.store();
    let tab_a = CartWorkflow::new(&store_a, Some(&actor));
    let tab_b = CartWorkflow::new(&store_b, Some(&actor));

    tab_a
        .add_to_cart(vec![headphones(5)])
        .await
        .expect("first write succeeds");
    let final_write = tab_b
        .add_to_cart(vec![smart_watch(1)])
        .await
        .expect("second write succeeds");

    // No merge: the cart equals the last committed write in full.
    let cart = tab_a.get_cart().await.expect("get cart succeeds");
    assert_eq!(cart, final_write);
    assert_eq!(cart.items.len(), 1);
    assert_eq!(
        cart.items.first().expect("one item").product_id,
        ProductId::new(2)
    );
}

#[tokio::test]
async fn cart_authorization_follows_the_acting_identity() {
    let backend = MemoryBackend::new();
    let store = backend.store();
    let ana = register_actor(&backend, "ana@firma.ro").await;
    let dan = register_actor(&backend, "dan@firma.ro").await;

    CartWorkflow::new(&store, Some(&ana))
        .add_to_cart(vec![headphones(1)])
        .await
        .expect("ana's write succeeds");

    // A different identity sees its own (empty) cart, not ana's.
    let dans_cart = CartWorkflow::new(&store, Some(&dan))
        .get_cart()
        .await
        .expect("dan's read succeeds");
    assert!(dans_cart.items.is_empty());
}
