//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{BackendError, IdentityClient, RestDocumentStore};
use crate::config::MarigoldConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// configuration and the two backend collaborator clients. It is
/// constructed once in `main` and passed by reference; handlers borrow it,
/// never re-create it.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: MarigoldConfig,
    identity: IdentityClient,
    store: RestDocumentStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Both backend clients share one HTTP connection pool configured with
    /// the per-round-trip timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: MarigoldConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(config.backend.timeout)
            .build()
            .map_err(BackendError::Http)?;

        let identity = IdentityClient::with_client(http.clone(), &config.backend);
        let store = RestDocumentStore::with_client(http, &config.backend);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                identity,
                store,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &MarigoldConfig {
        &self.inner.config
    }

    /// Get a reference to the identity provider client.
    #[must_use]
    pub fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }

    /// Get a reference to the document store client.
    #[must_use]
    pub fn store(&self) -> &RestDocumentStore {
        &self.inner.store
    }
}
