//! Session and account service.
//!
//! Two layers share the same operations:
//!
//! - [`AccountService`] - stateless per-call operations over borrowed
//!   backend clients. The HTTP routes use this with the cookie session's
//!   identity as the actor.
//! - [`SessionState`] - one actor's observable session (the CLI and tests
//!   drive this): current identity, a ready flag that flips on the identity
//!   provider's first session-change notification, and the last recorded
//!   error. It owns its change subscription and releases it exactly once
//!   when dropped.

mod error;

pub use error::SessionError;

use std::sync::Mutex;

use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use marigold_core::{
    AdminPermissions, CollaborationType, Email, PreferredChannel, PreferredLanguage, UserId,
};

use crate::backend::{
    BackendError, DocumentStore, Filter, Identity, IdentityProvider, SessionChanges, collections,
};
use crate::models::user::{AdminDetails, CompanyDetails, RoleProfile, UserProfile};

use error::map_identity_error;

/// Minimum password length accepted by the registration form.
///
/// Stricter than the identity provider's own policy, so weak passwords are
/// rejected before any network call.
const MIN_PASSWORD_LENGTH: usize = 8;

// =============================================================================
// Registration form
// =============================================================================

/// Registration input, validated per role variant before any write.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub contact_name: String,
    #[serde(default)]
    pub contact_position: String,
    pub phone_number: String,
    #[serde(default)]
    pub terms_accepted: bool,
    #[serde(default)]
    pub gdpr_accepted: bool,
    #[serde(flatten)]
    pub role: RoleForm,
}

/// Role-dependent registration fields, tagged by `userType`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "userType", rename_all = "lowercase")]
pub enum RoleForm {
    Company(CompanyForm),
    Admin(AdminForm),
}

/// Company registration fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyForm {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub cui: String,
    #[serde(default)]
    pub registration_number: String,
    #[serde(default)]
    pub social_address: String,
    #[serde(default)]
    pub delivery_address: String,
    #[serde(default)]
    pub iban: String,
    #[serde(default)]
    pub bank: String,
    #[serde(default)]
    pub vat_payer: bool,
    pub collaboration_type: Option<CollaborationType>,
    #[serde(default)]
    pub other_collaboration_details: String,
    #[serde(default)]
    pub preferred_channel: PreferredChannel,
    #[serde(default)]
    pub preferred_language: PreferredLanguage,
}

/// Admin registration fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminForm {
    #[serde(default)]
    pub permissions: AdminPermissions,
}

impl RegistrationForm {
    /// Validate the form, returning the parsed email on success.
    ///
    /// Validation is exhaustive per role variant: company business fields
    /// are required only for company registrations.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for missing fields and mismatched passwords,
    /// `WeakPassword` for short passwords, `InvalidEmail` for a malformed
    /// address.
    pub fn validate(&self) -> Result<Email, SessionError> {
        if let RoleForm::Company(company) = &self.role {
            if company.company_name.trim().is_empty() {
                return Err(invalid("company name is required"));
            }
            if company.cui.trim().is_empty() {
                return Err(invalid("fiscal code (CUI) is required"));
            }
            if company.social_address.trim().is_empty() {
                return Err(invalid("registered office address is required"));
            }
            let Some(collaboration) = company.collaboration_type else {
                return Err(invalid("collaboration type is required"));
            };
            if collaboration == CollaborationType::Other
                && company.other_collaboration_details.trim().is_empty()
            {
                return Err(invalid("details for the requested collaboration are required"));
            }
        }

        if self.contact_name.trim().is_empty() {
            return Err(invalid("contact name is required"));
        }
        if self.phone_number.trim().is_empty() {
            return Err(invalid("phone number is required"));
        }

        let email = Email::parse(self.email.trim())?;

        if self.password.len() < MIN_PASSWORD_LENGTH {
            return Err(SessionError::WeakPassword(format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        if self.password != self.confirm_password {
            return Err(invalid("passwords do not match"));
        }

        if !self.terms_accepted {
            return Err(invalid("terms and conditions must be accepted"));
        }
        if !self.gdpr_accepted {
            return Err(invalid("personal data processing must be accepted"));
        }

        Ok(email)
    }

    /// The display name to set on the identity, when any.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        let name = self.contact_name.trim();
        (!name.is_empty()).then(|| name.to_owned())
    }

    /// Build the profile document for a freshly registered identity.
    #[must_use]
    pub fn into_profile(self, identity: &Identity) -> UserProfile {
        let role = match self.role {
            RoleForm::Company(company) => RoleProfile::Company(CompanyDetails {
                company_name: company.company_name,
                cui: company.cui,
                registration_number: company.registration_number,
                social_address: company.social_address,
                delivery_address: company.delivery_address,
                iban: company.iban,
                bank: company.bank,
                vat_payer: company.vat_payer,
                collaboration_type: company
                    .collaboration_type
                    .unwrap_or(CollaborationType::Other),
                other_collaboration_details: company.other_collaboration_details,
                preferred_channel: company.preferred_channel,
                preferred_language: company.preferred_language,
            }),
            RoleForm::Admin(admin) => RoleProfile::Admin(AdminDetails {
                permissions: admin.permissions,
            }),
        };

        UserProfile {
            uid: identity.uid.clone(),
            email: identity.email.clone(),
            display_name: identity.display_name.clone(),
            created_at: None,
            contact_name: self.contact_name,
            contact_position: self.contact_position,
            phone_number: self.phone_number,
            terms_accepted: self.terms_accepted,
            gdpr_accepted: self.gdpr_accepted,
            role,
        }
    }
}

fn invalid(message: &str) -> SessionError {
    SessionError::InvalidInput(message.to_owned())
}

// =============================================================================
// AccountService
// =============================================================================

/// Stateless account operations over borrowed backend clients.
pub struct AccountService<'a, I, S> {
    identity: &'a I,
    store: &'a S,
}

impl<'a, I, S> AccountService<'a, I, S>
where
    I: IdentityProvider,
    S: DocumentStore,
{
    /// Create a new account service.
    #[must_use]
    pub const fn new(identity: &'a I, store: &'a S) -> Self {
        Self { identity, store }
    }

    /// Register a new account: create the identity, set its display name,
    /// then write the profile document keyed by the new uid.
    ///
    /// The identity create and the profile write are not transactional; a
    /// failure between the two leaves an identity without a profile, which
    /// is logged and surfaced rather than rolled back.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` when the email is taken, `WeakPassword` /
    /// `InvalidEmail` / `InvalidInput` for rejected input, `Backend` for
    /// transport failures.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: RegistrationForm) -> Result<UserProfile, SessionError> {
        let email = form.validate()?;

        let mut identity = self
            .identity
            .register(&email, &form.password)
            .await
            .map_err(map_identity_error)?;

        if let Some(name) = form.display_name() {
            self.identity
                .set_display_name(&identity.uid, &name)
                .await
                .map_err(map_identity_error)?;
            identity.display_name = Some(name);
        }

        let profile = form.into_profile(&identity);
        let document = serde_json::to_value(&profile).map_err(BackendError::Parse)?;

        if let Err(err) = self
            .store
            .create_or_replace(collections::USERS, identity.uid.as_str(), document)
            .await
        {
            // Acknowledged gap: the identity exists but has no profile.
            tracing::warn!(
                uid = %identity.uid,
                error = %err,
                "profile write failed after identity creation; account left without profile"
            );
            return Err(err.into());
        }

        tracing::info!(uid = %identity.uid, user_type = ?profile.user_type(), "account registered");
        Ok(profile)
    }

    /// Authenticate with email and password.
    ///
    /// # Errors
    ///
    /// `NotFound`, `InvalidCredentials`, or `RateLimited` per the provider
    /// signal.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, SessionError> {
        let email = Email::parse(email)?;
        self.identity
            .login(&email, password)
            .await
            .map_err(map_identity_error)
    }

    /// End the provider session. Idempotent.
    ///
    /// # Errors
    ///
    /// `Backend` for transport failures.
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.identity.logout().await.map_err(map_identity_error)
    }

    /// Merge-patch the actor's profile document.
    ///
    /// The role is immutable after creation, so patches naming `userType`
    /// are rejected before any write.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for role changes, `Backend` for store failures.
    #[instrument(skip(self, patch), fields(uid = %actor.uid))]
    pub async fn update_profile(
        &self,
        actor: &Identity,
        patch: Value,
    ) -> Result<(), SessionError> {
        if patch.get("userType").is_some() {
            return Err(invalid("account type cannot be changed"));
        }
        if patch.get("uid").is_some() {
            return Err(invalid("uid cannot be changed"));
        }

        self.store
            .merge_patch(collections::USERS, actor.uid.as_str(), patch)
            .await?;
        Ok(())
    }

    /// Read a profile by uid. A missing profile is `Ok(None)`, not an error.
    ///
    /// # Errors
    ///
    /// `Backend` for store failures or a document that no longer parses.
    pub async fn fetch_profile(&self, uid: &UserId) -> Result<Option<UserProfile>, SessionError> {
        match self
            .store
            .read_by_key(collections::USERS, uid.as_str())
            .await?
        {
            None => Ok(None),
            Some(document) => {
                let profile = serde_json::from_value(document).map_err(BackendError::Parse)?;
                Ok(Some(profile))
            }
        }
    }

    /// All company profiles, for the admin clients listing.
    ///
    /// # Errors
    ///
    /// `Backend` for store failures.
    pub async fn list_companies(&self) -> Result<Vec<UserProfile>, SessionError> {
        let documents = self
            .store
            .query(
                collections::USERS,
                &[Filter::equals("userType", "company")],
                None,
            )
            .await?;

        documents
            .into_iter()
            .map(|doc| {
                serde_json::from_value(doc.data)
                    .map_err(|e| SessionError::Backend(BackendError::Parse(e)))
            })
            .collect()
    }
}

// =============================================================================
// SessionState
// =============================================================================

/// One actor's observable session over the identity provider and store.
///
/// Holds the change subscription for its whole lifetime; dropping the
/// `SessionState` releases it exactly once. `ready()` is false until the
/// provider's first session-change notification (login, logout, or initial
/// resolution). There is no retry: a failed resolution simply leaves
/// `ready()` false for that cycle.
pub struct SessionState<I, S> {
    identity: I,
    store: S,
    changes: SessionChanges,
    last_error: Mutex<Option<String>>,
}

impl<I, S> SessionState<I, S>
where
    I: IdentityProvider,
    S: DocumentStore,
{
    /// Create the session state and subscribe to provider changes.
    #[must_use]
    pub fn new(identity: I, store: S) -> Self {
        let changes = identity.subscribe();
        Self {
            identity,
            store,
            changes,
            last_error: Mutex::new(None),
        }
    }

    fn service(&self) -> AccountService<'_, I, S> {
        AccountService::new(&self.identity, &self.store)
    }

    /// Record the outcome of an operation in `last_error` and pass it on.
    fn record<T>(&self, result: Result<T, SessionError>) -> Result<T, SessionError> {
        let mut last = self
            .last_error
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *last = result.as_ref().err().map(ToString::to_string);
        drop(last);
        result
    }

    /// Whether the provider has resolved its session at least once.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.changes.resolved()
    }

    /// The current identity, if any.
    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.identity.current()
    }

    /// The last recorded error message, if the most recent operation failed.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Hand out an additional change subscription.
    #[must_use]
    pub fn subscribe(&self) -> SessionChanges {
        self.identity.subscribe()
    }

    /// Perform the initial session resolution.
    ///
    /// # Errors
    ///
    /// `Backend` for transport failures; `ready()` stays false in that case.
    pub async fn resolve(&self) -> Result<Option<Identity>, SessionError> {
        let result = self.identity.resolve().await.map_err(SessionError::from);
        self.record(result)
    }

    /// Register a new account and sign in as it.
    ///
    /// # Errors
    ///
    /// See [`AccountService::register`].
    pub async fn register(&self, form: RegistrationForm) -> Result<UserProfile, SessionError> {
        let result = self.service().register(form).await;
        self.record(result)
    }

    /// Sign in.
    ///
    /// # Errors
    ///
    /// See [`AccountService::login`].
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, SessionError> {
        let result = self.service().login(email, password).await;
        self.record(result)
    }

    /// Sign out. Idempotent.
    ///
    /// # Errors
    ///
    /// `Backend` for transport failures.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let result = self.service().logout().await;
        self.record(result)
    }

    /// Merge-patch the current user's profile.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` when no identity is signed in; otherwise see
    /// [`AccountService::update_profile`].
    pub async fn update_profile(&self, patch: Value) -> Result<(), SessionError> {
        let Some(actor) = self.current() else {
            return self.record(Err(SessionError::Unauthenticated));
        };
        let result = self.service().update_profile(&actor, patch).await;
        self.record(result)
    }

    /// Read a profile by uid.
    ///
    /// # Errors
    ///
    /// See [`AccountService::fetch_profile`].
    pub async fn fetch_profile(&self, uid: &UserId) -> Result<Option<UserProfile>, SessionError> {
        let result = self.service().fetch_profile(uid).await;
        self.record(result)
    }
}
