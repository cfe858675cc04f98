//! Backend reachability probe.
//!
//! Builds both backend clients from the environment, performs the initial
//! identity resolution, and reads a probe key from the document store. Any
//! transport failure (including a timeout) exits non-zero.

use thiserror::Error;

use marigold_storefront::backend::{
    BackendError, DocumentStore, IdentityClient, IdentityProvider, RestDocumentStore, collections,
};
use marigold_storefront::config::{BackendConfig, ConfigError};

/// Errors that can occur during the backend check.
#[derive(Debug, Error)]
pub enum CheckError {
    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The backend was unreachable or rejected the probe.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Run the reachability probe.
pub async fn run() -> Result<(), CheckError> {
    dotenvy::dotenv().ok();

    let config = BackendConfig::from_env()?;
    tracing::info!("Probing backend at {}", config.base_url);

    let identity = IdentityClient::new(&config)?;
    identity.resolve().await?;
    tracing::info!("Identity provider reachable");

    let store = RestDocumentStore::new(&config)?;
    let probe = store
        .read_by_key(collections::USERS, "reachability-probe")
        .await?;
    tracing::info!(
        "Document store reachable (probe key {})",
        if probe.is_some() { "present" } else { "absent" }
    );

    tracing::info!("Backend check passed");
    Ok(())
}
