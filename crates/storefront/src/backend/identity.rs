//! Identity provider contract and REST client.
//!
//! The hosted identity provider owns accounts and passwords. The storefront
//! consumes a narrow surface: register, login, logout, display-name update,
//! and a session-change subscription.
//!
//! # Sessions and notifications
//!
//! Each provider handle tracks one actor's current session (the analog of a
//! browser tab). Session changes - initial resolution, login, logout - are
//! broadcast through a `tokio::sync::watch` channel. Subscribers hold a
//! [`SessionChanges`] handle; dropping it is the unregister, so a
//! subscription can never outlive its owning scope.
//!
//! Well-known error codes surfaced from the provider:
//! `EMAIL_EXISTS`, `WEAK_PASSWORD`, `INVALID_EMAIL`, `EMAIL_NOT_FOUND`,
//! `INVALID_PASSWORD`, `TOO_MANY_ATTEMPTS_TRY_LATER`.

use std::future::Future;
use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::instrument;

use marigold_core::{Email, UserId};

use super::BackendError;
use crate::config::BackendConfig;

/// An authenticated principal, as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Provider-assigned unique id.
    pub uid: UserId,
    /// Account email.
    pub email: Email,
    /// Optional display name, set once at registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// One session-change notification.
///
/// `seq` is 0 until the provider's first resolution; every change after
/// that increments it. A subscriber can therefore distinguish "not yet
/// resolved" from "resolved to no identity".
#[derive(Debug, Clone, Default)]
pub struct SessionEvent {
    /// Monotonic change counter; 0 means unresolved.
    pub seq: u64,
    /// The identity after this change, or `None` when signed out.
    pub identity: Option<Identity>,
}

/// A live subscription to a provider's session changes.
///
/// Dropping the handle releases the subscription.
#[derive(Debug)]
pub struct SessionChanges {
    rx: watch::Receiver<SessionEvent>,
}

impl SessionChanges {
    /// The most recent event, without waiting.
    #[must_use]
    pub fn latest(&self) -> SessionEvent {
        self.rx.borrow().clone()
    }

    /// Whether the provider has resolved its session at least once.
    #[must_use]
    pub fn resolved(&self) -> bool {
        self.rx.borrow().seq > 0
    }

    /// Wait for the next change. Returns `None` once the provider handle
    /// has been dropped.
    pub async fn next(&mut self) -> Option<SessionEvent> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// Per-handle session bookkeeping shared by provider implementations.
#[derive(Debug)]
pub(crate) struct SessionChannel {
    tx: watch::Sender<SessionEvent>,
}

impl SessionChannel {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionEvent::default());
        Self { tx }
    }

    /// Record a session change and notify subscribers.
    pub(crate) fn announce(&self, identity: Option<Identity>) {
        self.tx.send_modify(|event| {
            event.seq += 1;
            event.identity = identity;
        });
    }

    pub(crate) fn current(&self) -> Option<Identity> {
        self.tx.borrow().identity.clone()
    }

    pub(crate) fn subscribe(&self) -> SessionChanges {
        SessionChanges {
            rx: self.tx.subscribe(),
        }
    }
}

/// The identity provider surface consumed by the storefront.
pub trait IdentityProvider: Send + Sync {
    /// Create an account. The new identity becomes this handle's current
    /// session and is announced to subscribers.
    fn register(
        &self,
        email: &Email,
        password: &str,
    ) -> impl Future<Output = Result<Identity, BackendError>> + Send;

    /// Set the display name on an account. Applied to the current session
    /// when it belongs to the same uid.
    fn set_display_name(
        &self,
        uid: &UserId,
        name: &str,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Authenticate with email and password. The identity becomes this
    /// handle's current session and is announced to subscribers.
    fn login(
        &self,
        email: &Email,
        password: &str,
    ) -> impl Future<Output = Result<Identity, BackendError>> + Send;

    /// End the current session. Idempotent.
    fn logout(&self) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Perform the initial session resolution (the page-load analog) and
    /// announce the result. Flips subscribers from unresolved to resolved
    /// even when there is no session to restore.
    fn resolve(&self) -> impl Future<Output = Result<Option<Identity>, BackendError>> + Send;

    /// The current session's identity, if any.
    fn current(&self) -> Option<Identity>;

    /// Subscribe to session changes.
    fn subscribe(&self) -> SessionChanges;
}

// =============================================================================
// IdentityClient
// =============================================================================

#[derive(Debug, Serialize)]
struct CredentialsRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    local_id: &'a str,
    display_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// HTTP client for the hosted identity provider.
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
    session: SessionChannel,
}

struct IdentityClientInner {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl IdentityClient {
    /// Create a new client with its own HTTP connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(BackendError::Http)?;
        Ok(Self::with_client(client, config))
    }

    /// Create a new client reusing an existing HTTP connection pool.
    #[must_use]
    pub fn with_client(client: reqwest::Client, config: &BackendConfig) -> Self {
        Self {
            inner: Arc::new(IdentityClientInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_owned(),
                api_key: config.api_key.expose_secret().to_owned(),
            }),
            session: SessionChannel::new(),
        }
    }

    /// POST to an `accounts:{action}` endpoint and parse the account body.
    async fn account_call<B: Serialize + Sync>(
        &self,
        action: &str,
        body: &B,
    ) -> Result<AccountResponse, BackendError> {
        let url = format!("{}/v1/accounts:{action}", self.inner.base_url);
        let response = self
            .inner
            .client
            .post(url)
            .bearer_auth(&self.inner.api_key)
            .json(body)
            .send()
            .await
            .map_err(BackendError::from)?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(BackendError::RateLimited(super::retry_after_seconds(
                &response,
            )));
        }

        let status = response.status();
        let text = response.text().await.map_err(BackendError::from)?;

        if !status.is_success() {
            return Err(super::error_from_response(status, &text));
        }

        serde_json::from_str(&text).map_err(BackendError::Parse)
    }
}

impl TryFrom<AccountResponse> for Identity {
    type Error = BackendError;

    fn try_from(account: AccountResponse) -> Result<Self, Self::Error> {
        let email = Email::parse(&account.email).map_err(|e| BackendError::Api {
            status: 502,
            code: "MALFORMED_ACCOUNT".to_owned(),
            message: format!("invalid email in account response: {e}"),
        })?;

        Ok(Self {
            uid: UserId::new(account.local_id),
            email,
            display_name: account.display_name,
        })
    }
}

impl IdentityProvider for IdentityClient {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn register(&self, email: &Email, password: &str) -> Result<Identity, BackendError> {
        let body = CredentialsRequest {
            email: email.as_str(),
            password,
        };
        let account = self.account_call("signUp", &body).await?;
        let identity = Identity::try_from(account)?;
        self.session.announce(Some(identity.clone()));
        Ok(identity)
    }

    #[instrument(skip(self), fields(uid = %uid))]
    async fn set_display_name(&self, uid: &UserId, name: &str) -> Result<(), BackendError> {
        let body = UpdateRequest {
            local_id: uid.as_str(),
            display_name: name,
        };
        self.account_call("update", &body).await?;

        // Keep the current session in sync when it is the same account.
        if let Some(mut identity) = self.session.current()
            && identity.uid == *uid
        {
            identity.display_name = Some(name.to_owned());
            self.session.announce(Some(identity));
        }

        Ok(())
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn login(&self, email: &Email, password: &str) -> Result<Identity, BackendError> {
        let body = CredentialsRequest {
            email: email.as_str(),
            password,
        };
        let account = self.account_call("signInWithPassword", &body).await?;
        let identity = Identity::try_from(account)?;
        self.session.announce(Some(identity.clone()));
        Ok(identity)
    }

    #[instrument(skip(self))]
    async fn logout(&self) -> Result<(), BackendError> {
        // Sessions are held client-side; logout drops the local session and
        // notifies subscribers. Safe to call when already signed out.
        self.session.announce(None);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn resolve(&self) -> Result<Option<Identity>, BackendError> {
        // No token persistence across processes, so resolution restores
        // whatever this handle already holds (usually nothing) and marks
        // the session state ready.
        let current = self.session.current();
        self.session.announce(current.clone());
        Ok(current)
    }

    fn current(&self) -> Option<Identity> {
        self.session.current()
    }

    fn subscribe(&self) -> SessionChanges {
        self.session.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_channel_starts_unresolved() {
        let channel = SessionChannel::new();
        let changes = channel.subscribe();
        assert!(!changes.resolved());
        assert!(changes.latest().identity.is_none());
    }

    #[test]
    fn test_session_channel_announce_resolves() {
        let channel = SessionChannel::new();
        let changes = channel.subscribe();
        channel.announce(None);
        assert!(changes.resolved());
        assert_eq!(changes.latest().seq, 1);
    }

    #[test]
    fn test_identity_serde_field_names() {
        let identity = Identity {
            uid: UserId::new("u-1"),
            email: Email::parse("a@b.c").unwrap(),
            display_name: Some("Ana".to_owned()),
        };
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["uid"], "u-1");
        assert_eq!(json["email"], "a@b.c");
        assert_eq!(json["displayName"], "Ana");
    }

    #[tokio::test]
    async fn test_subscriber_sees_changes_in_order() {
        let channel = SessionChannel::new();
        let mut changes = channel.subscribe();

        channel.announce(Some(Identity {
            uid: UserId::new("u-1"),
            email: Email::parse("a@b.c").unwrap(),
            display_name: None,
        }));
        let event = changes.next().await.unwrap();
        assert_eq!(event.seq, 1);
        assert!(event.identity.is_some());

        channel.announce(None);
        let event = changes.next().await.unwrap();
        assert_eq!(event.seq, 2);
        assert!(event.identity.is_none());
    }
}
