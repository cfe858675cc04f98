//! Cart/order workflow error types.

use thiserror::Error;

use marigold_core::OrderId;

use crate::backend::BackendError;

/// Which checkout step failed after the order document was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStage {
    /// The cart clear after the order create.
    ClearCart,
    /// The final patch of the order status to `completed`.
    MarkCompleted,
}

impl std::fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClearCart => write!(f, "cart clear"),
            Self::MarkCompleted => write!(f, "status update"),
        }
    }
}

/// Errors that can occur during cart and order operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Operation requires a current identity and none is present.
    #[error("not authenticated")]
    Unauthenticated,

    /// Checkout attempted with no line items; rejected before any write.
    #[error("cart is empty")]
    EmptyCart,

    /// Malformed line items, caught before any write.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The order document was durably written but a later checkout step
    /// failed. The order stays `pending` for reconciliation; the cart may
    /// be stale. Surfaced distinctly so it is never mistaken for a clean
    /// failure or a clean success.
    #[error("order {order_id} was recorded but the {stage} step failed: {source}")]
    PartialCheckout {
        order_id: OrderId,
        stage: CheckoutStage,
        #[source]
        source: BackendError,
    },

    /// Backend transport or protocol error.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}
