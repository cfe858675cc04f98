//! Static product catalog.
//!
//! The catalog is an in-memory list; products feed the cart workflow, which
//! denormalizes name and unit price into line items at add-time.

use rust_decimal::Decimal;

use marigold_core::ProductId;

use crate::models::Product;

/// All catalog products.
#[must_use]
pub fn products() -> Vec<Product> {
    vec![
        Product {
            id: ProductId::new(1),
            name: "Wireless Headphones".to_owned(),
            description: "High-quality wireless headphones with noise cancellation technology \
                          for immersive audio experience. Perfect for travel, work, or relaxation."
                .to_owned(),
            price: Decimal::new(9999, 2),
            image: "https://i.imgur.com/Q1M8SrN.jpeg".to_owned(),
        },
        Product {
            id: ProductId::new(2),
            name: "Smart Watch".to_owned(),
            description: "Feature-rich smartwatch with health monitoring, GPS, and long battery \
                          life. Track your fitness goals and stay connected on the go."
                .to_owned(),
            price: Decimal::new(19999, 2),
            image: "https://i.imgur.com/Q1M8SrN.jpeg".to_owned(),
        },
    ]
}

/// Look up a product by id.
#[must_use]
pub fn find(id: ProductId) -> Option<Product> {
    products().into_iter().find(|product| product.id == id)
}
