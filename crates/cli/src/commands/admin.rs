//! Admin account bootstrap.
//!
//! Registers an admin account against the hosted backend through the same
//! session state the storefront uses, so validation, the display-name
//! update, and the profile write behave identically.

use thiserror::Error;

use marigold_core::AdminPermissions;
use marigold_storefront::backend::{BackendError, IdentityClient, RestDocumentStore};
use marigold_storefront::config::{BackendConfig, ConfigError};
use marigold_storefront::services::session::{
    AdminForm, RegistrationForm, RoleForm, SessionError, SessionState,
};

/// Errors that can occur during admin bootstrap.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend client could not be built.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Registration was rejected.
    #[error("registration failed: {0}")]
    Session(#[from] SessionError),
}

/// Input for `admin create`.
pub struct CreateAdmin {
    pub email: String,
    pub name: String,
    pub phone: String,
    pub password: String,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_manage_users: bool,
}

/// Create a new admin account.
pub async fn create(input: CreateAdmin) -> Result<(), AdminError> {
    dotenvy::dotenv().ok();

    let config = BackendConfig::from_env()?;
    let session = SessionState::new(
        IdentityClient::new(&config)?,
        RestDocumentStore::new(&config)?,
    );
    session.resolve().await?;

    tracing::info!("Creating admin account: {}", input.email);

    let form = RegistrationForm {
        email: input.email.clone(),
        password: input.password.clone(),
        confirm_password: input.password,
        contact_name: input.name,
        contact_position: String::new(),
        phone_number: input.phone,
        terms_accepted: true,
        gdpr_accepted: true,
        role: RoleForm::Admin(AdminForm {
            permissions: AdminPermissions {
                can_view: true,
                can_edit: input.can_edit,
                can_delete: input.can_delete,
                can_manage_users: input.can_manage_users,
            },
        }),
    };

    let profile = session.register(form).await?;

    tracing::info!(
        "Admin account created successfully! uid: {}, email: {}",
        profile.uid,
        profile.email
    );

    Ok(())
}
