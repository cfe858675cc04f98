//! Session-related types.
//!
//! Types stored in the HTTP cookie session for authentication state.

use serde::{Deserialize, Serialize};

use marigold_core::{Email, UserId};

use crate::backend::Identity;

/// Session-stored user identity.
///
/// Minimal data stored in the cookie session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Identity provider uid.
    pub uid: UserId,
    /// User's email address.
    pub email: Email,
    /// Display name, when one was set at registration.
    pub display_name: Option<String>,
}

impl CurrentUser {
    /// The identity this session acts as.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            uid: self.uid.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

impl From<&Identity> for CurrentUser {
    fn from(identity: &Identity) -> Self {
        Self {
            uid: identity.uid.clone(),
            email: identity.email.clone(),
            display_name: identity.display_name.clone(),
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}
