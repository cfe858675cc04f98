//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `session` - registration, login/logout, profile reads and patches, and
//!   the observable per-actor session state
//! - `workflow` - the cart/order workflow (totals, cart mutations, the
//!   checkout sequence, order history)
//!
//! Services borrow the backend clients per call; nothing here owns global
//! state beyond what a single actor's session requires.

pub mod session;
pub mod workflow;

pub use session::{AccountService, RegistrationForm, SessionError, SessionState};
pub use workflow::{CartWorkflow, CheckoutInput, LineItemInput, OrderReceipt, WorkflowError};
