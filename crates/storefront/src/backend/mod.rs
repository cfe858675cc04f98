//! Clients for the hosted backend platform.
//!
//! # Architecture
//!
//! Marigold keeps no local database. Everything durable lives behind two
//! managed collaborators, each consumed through a small trait:
//!
//! - [`IdentityProvider`] - account registration, login/logout, and
//!   session-change notifications
//! - [`DocumentStore`] - a schemaless per-entity document store with
//!   create/replace, merge-patch, read-by-key, and equality/order queries
//!
//! The production implementations ([`IdentityClient`],
//! [`RestDocumentStore`]) speak JSON over HTTP via `reqwest` with a
//! per-request timeout. [`MemoryBackend`] implements the same contracts
//! in-process for tests and local development.
//!
//! # Example
//!
//! ```rust,ignore
//! use marigold_storefront::backend::{DocumentStore, MemoryBackend};
//!
//! let backend = MemoryBackend::new();
//! let store = backend.store();
//!
//! store.create_or_replace("carts", "u-1", serde_json::json!({"items": []})).await?;
//! let cart = store.read_by_key("carts", "u-1").await?;
//! ```

mod docstore;
mod identity;
pub mod memory;

pub use docstore::{
    Direction, DocumentStore, Filter, OrderBy, RestDocumentStore, StoredDocument,
};
pub use identity::{Identity, IdentityClient, IdentityProvider, SessionChanges, SessionEvent};
pub use memory::{MemoryBackend, MemoryIdentity, MemoryStore};

use thiserror::Error;

/// Collection names used by the storefront.
///
/// These match the collections already present in the hosted store; renaming
/// one orphans existing documents.
pub mod collections {
    /// User profile documents, keyed by identity uid.
    pub const USERS: &str = "users";
    /// Cart documents, keyed by owner uid.
    pub const CARTS: &str = "carts";
    /// Order documents, keyed by client-generated order id.
    pub const ORDERS: &str = "orders";
}

/// Errors that can occur when talking to the hosted backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// The round-trip exceeded the configured timeout.
    ///
    /// Kept distinct from [`BackendError::Http`] so callers can tell a slow
    /// backend from a broken one.
    #[error("backend request timed out")]
    Timeout,

    /// The backend rejected the request with a structured error.
    #[error("backend error {status}: {code}")]
    Api {
        /// HTTP status returned by the backend.
        status: u16,
        /// Machine-readable error code (e.g. `EMAIL_EXISTS`).
        code: String,
        /// Human-readable message, when the backend provides one.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by the backend.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The API key was rejected.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

impl BackendError {
    /// The machine-readable error code, when this is a structured API error.
    #[must_use]
    pub fn api_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Whether this error means the backend was unreachable or too slow,
    /// as opposed to rejecting the request.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Timeout)
    }
}

/// Error body shape returned by both backend services.
#[derive(Debug, serde::Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

/// Map a non-success backend response to a [`BackendError`].
///
/// Parses the standard `{"error": {"message": "CODE"}}` body when present;
/// falls back to the raw (truncated) body text otherwise. The body is logged
/// before mapping so failed calls are diagnosable.
fn error_from_response(status: reqwest::StatusCode, body: &str) -> BackendError {
    tracing::debug!(
        status = %status,
        body = %body.chars().take(500).collect::<String>(),
        "backend returned non-success status"
    );

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return BackendError::PermissionDenied(format!("HTTP {status}"));
    }

    let (code, message) = serde_json::from_str::<ApiErrorBody>(body).map_or_else(
        |_| {
            let raw: String = body.chars().take(200).collect();
            ("UNKNOWN".to_owned(), raw)
        },
        |parsed| {
            (
                parsed.error.message.clone(),
                parsed.error.message,
            )
        },
    );

    BackendError::Api {
        status: status.as_u16(),
        code,
        message,
    }
}

/// Extract the `Retry-After` value from a 429 response, defaulting to 1s.
fn retry_after_seconds(response: &reqwest::Response) -> u64 {
    response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(1)
}
