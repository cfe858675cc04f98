//! Catalog route handlers.

use axum::{Json, response::IntoResponse};

use crate::catalog;

/// List the product catalog.
pub async fn index() -> impl IntoResponse {
    Json(catalog::products())
}
