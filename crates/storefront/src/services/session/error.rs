//! Session and account error types.

use thiserror::Error;

use marigold_core::EmailError;

use crate::backend::BackendError;

/// Errors that can occur during session and account operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password too weak.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Malformed or missing registration/profile fields, caught before any
    /// write.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An account with this email already exists.
    #[error("an account with this email already exists")]
    AlreadyExists,

    /// Wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No account for this email.
    #[error("account not found")]
    NotFound,

    /// The identity provider throttled the caller.
    #[error("too many attempts, try again later")]
    RateLimited,

    /// Operation requires a current identity and none is present.
    #[error("not authenticated")]
    Unauthenticated,

    /// Backend transport or protocol error.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Map identity provider errors onto the session taxonomy.
///
/// The provider signals account-level failures through well-known error
/// codes; anything unrecognized stays a backend error.
pub(crate) fn map_identity_error(err: BackendError) -> SessionError {
    match &err {
        BackendError::RateLimited(_) => SessionError::RateLimited,
        BackendError::Api { code, message, .. } => match code.as_str() {
            "EMAIL_EXISTS" => SessionError::AlreadyExists,
            "WEAK_PASSWORD" => SessionError::WeakPassword(message.clone()),
            "INVALID_EMAIL" => SessionError::InvalidInput("email address is invalid".to_owned()),
            "EMAIL_NOT_FOUND" => SessionError::NotFound,
            "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => SessionError::InvalidCredentials,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => SessionError::RateLimited,
            _ => SessionError::Backend(err),
        },
        _ => SessionError::Backend(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: &str) -> BackendError {
        BackendError::Api {
            status: 400,
            code: code.to_owned(),
            message: code.to_owned(),
        }
    }

    #[test]
    fn test_known_codes_map_to_taxonomy() {
        assert!(matches!(
            map_identity_error(api_error("EMAIL_EXISTS")),
            SessionError::AlreadyExists
        ));
        assert!(matches!(
            map_identity_error(api_error("WEAK_PASSWORD")),
            SessionError::WeakPassword(_)
        ));
        assert!(matches!(
            map_identity_error(api_error("EMAIL_NOT_FOUND")),
            SessionError::NotFound
        ));
        assert!(matches!(
            map_identity_error(api_error("INVALID_PASSWORD")),
            SessionError::InvalidCredentials
        ));
        assert!(matches!(
            map_identity_error(api_error("TOO_MANY_ATTEMPTS_TRY_LATER")),
            SessionError::RateLimited
        ));
    }

    #[test]
    fn test_unknown_code_stays_backend_error() {
        assert!(matches!(
            map_identity_error(api_error("SOMETHING_NEW")),
            SessionError::Backend(_)
        ));
    }

    #[test]
    fn test_transport_errors_stay_backend_errors() {
        assert!(matches!(
            map_identity_error(BackendError::Timeout),
            SessionError::Backend(BackendError::Timeout)
        ));
    }
}
