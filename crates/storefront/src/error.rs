//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::backend::BackendError;
use crate::services::session::SessionError;
use crate::services::workflow::WorkflowError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Session or account operation failed.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Cart/order workflow operation failed.
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Backend call failed outside a service.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller lacks the required permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Whether this error should be captured to Sentry.
///
/// Client mistakes are not; backend failures, internal errors, and the
/// partial-checkout hazard are.
fn should_capture(error: &AppError) -> bool {
    match error {
        AppError::Backend(_) | AppError::Internal(_) => true,
        AppError::Session(err) => matches!(err, SessionError::Backend(_)),
        AppError::Workflow(err) => matches!(
            err,
            WorkflowError::Backend(_) | WorkflowError::PartialCheckout { .. }
        ),
        _ => false,
    }
}

fn backend_status(error: &BackendError) -> StatusCode {
    match error {
        BackendError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        BackendError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Session(err) => match err {
                SessionError::InvalidEmail(_)
                | SessionError::WeakPassword(_)
                | SessionError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                SessionError::AlreadyExists => StatusCode::CONFLICT,
                SessionError::InvalidCredentials
                | SessionError::NotFound
                | SessionError::Unauthenticated => StatusCode::UNAUTHORIZED,
                SessionError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                SessionError::Backend(err) => backend_status(err),
            },
            Self::Workflow(err) => match err {
                WorkflowError::Unauthenticated => StatusCode::UNAUTHORIZED,
                WorkflowError::EmptyCart | WorkflowError::InvalidInput(_) => {
                    StatusCode::BAD_REQUEST
                }
                WorkflowError::PartialCheckout { .. } => StatusCode::BAD_GATEWAY,
                WorkflowError::Backend(err) => backend_status(err),
            },
            Self::Backend(err) => backend_status(err),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-safe message. Backend internals are never exposed.
    fn message(&self) -> String {
        match self {
            Self::Backend(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Session(err) => match err {
                SessionError::Backend(_) => "External service error".to_string(),
                other => other.to_string(),
            },
            Self::Workflow(err) => match err {
                WorkflowError::Backend(_) => "External service error".to_string(),
                WorkflowError::PartialCheckout { order_id, .. } => format!(
                    "your order {order_id} was recorded, but the checkout did not fully finish; it will be reconciled"
                ),
                other => other.to_string(),
            },
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if should_capture(&self) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        let mut body = json!({ "error": self.message() });

        // Surface the order id on partial checkouts so clients and support
        // tooling can reconcile.
        if let Self::Workflow(WorkflowError::PartialCheckout { order_id, .. }) = &self {
            body["orderId"] = json!(order_id);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use marigold_core::OrderId;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("profile".to_string());
        assert_eq!(err.to_string(), "Not found: profile");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(get_status(AppError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_session_error_statuses() {
        assert_eq!(
            get_status(AppError::Session(SessionError::AlreadyExists)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Session(SessionError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Session(SessionError::RateLimited)),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Session(SessionError::WeakPassword(
                "too short".to_string()
            ))),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_workflow_error_statuses() {
        assert_eq!(
            get_status(AppError::Workflow(WorkflowError::Unauthenticated)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Workflow(WorkflowError::EmptyCart)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Workflow(WorkflowError::Backend(
                BackendError::Timeout
            ))),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_partial_checkout_is_bad_gateway_with_order_id() {
        let err = AppError::Workflow(WorkflowError::PartialCheckout {
            order_id: OrderId::new("ORD-1"),
            stage: crate::services::workflow::CheckoutStage::ClearCart,
            source: BackendError::Timeout,
        });
        assert_eq!(get_status(err), StatusCode::BAD_GATEWAY);
    }
}
