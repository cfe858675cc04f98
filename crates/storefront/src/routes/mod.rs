//! HTTP route handlers for the storefront JSON API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (backend reachability)
//!
//! # Auth (strict rate limit)
//! POST /auth/register          - Register a company or admin account
//! POST /auth/login             - Login, sets the session cookie
//! POST /auth/logout            - Logout
//!
//! # Account (requires auth)
//! GET  /account/profile        - Current user's profile document
//! PATCH /account/profile       - Merge-patch the profile (role immutable)
//!
//! # Catalog
//! GET  /products               - Static product list
//!
//! # Cart (requires auth)
//! GET    /cart                 - Current cart (canonical empty if none)
//! PUT    /cart                 - Replace cart wholesale (last-writer-wins)
//! DELETE /cart                 - Clear cart (idempotent)
//!
//! # Orders (requires auth)
//! POST /orders                 - Checkout the current cart
//! GET  /orders                 - Order history, newest first
//!
//! # Admin (requires auth + canView)
//! GET  /clients                - Company account listing
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod clients;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter())
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new().route(
        "/profile",
        get(account::profile).patch(account::update_profile),
    )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(cart::show).put(cart::replace).delete(cart::clear),
    )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new().route("/", post(orders::checkout).get(orders::history))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Catalog
        .route("/products", get(products::index))
        // Cart
        .nest("/cart", cart_routes())
        // Orders
        .nest("/orders", order_routes())
        // Account
        .nest("/account", account_routes())
        // Admin clients listing
        .route("/clients", get(clients::index))
        .layer(api_rate_limiter())
        // Auth (stricter limiter of its own)
        .nest("/auth", auth_routes())
}
