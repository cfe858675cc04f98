//! Integration test support for Marigold.
//!
//! The tests drive the session state and the cart/order workflow against
//! the in-memory backend, which implements the same collaborator contracts
//! as the hosted platform.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p marigold-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde_json::Value;

use marigold_core::AdminPermissions;
use marigold_storefront::backend::{
    BackendError, DocumentStore, Filter, Identity, IdentityProvider, MemoryBackend, MemoryStore,
    OrderBy, StoredDocument,
};
use marigold_storefront::services::session::{
    AdminForm, CompanyForm, RegistrationForm, RoleForm,
};

/// A valid company registration form for `email`.
#[must_use]
pub fn company_form(email: &str) -> RegistrationForm {
    RegistrationForm {
        email: email.to_owned(),
        password: "parola123".to_owned(),
        confirm_password: "parola123".to_owned(),
        contact_name: "Ana Pop".to_owned(),
        contact_position: "Director".to_owned(),
        phone_number: "+40700000000".to_owned(),
        terms_accepted: true,
        gdpr_accepted: true,
        role: RoleForm::Company(CompanyForm {
            company_name: "Firma SRL".to_owned(),
            cui: "RO123456".to_owned(),
            social_address: "Str. Lunga 1, Cluj".to_owned(),
            collaboration_type: Some(marigold_core::CollaborationType::Reseller),
            ..CompanyForm::default()
        }),
    }
}

/// A valid admin registration form for `email` with default permissions.
#[must_use]
pub fn admin_form(email: &str) -> RegistrationForm {
    RegistrationForm {
        role: RoleForm::Admin(AdminForm {
            permissions: AdminPermissions::default(),
        }),
        ..company_form(email)
    }
}

/// Register an account directly through the identity provider and return
/// its identity, for tests that do not need a profile document.
pub async fn register_actor(backend: &MemoryBackend, email: &str) -> Identity {
    let identity = backend.identity();
    let email = marigold_core::Email::parse(email).expect("test email is valid");
    identity
        .register(&email, "parola123")
        .await
        .expect("registration against the memory backend succeeds")
}

/// Which store operation the [`FlakyStore`] should fail next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailNext {
    /// Fail `create_or_replace` calls into the given collection.
    CreateIn(&'static str),
    /// Fail `merge_patch` calls into the given collection.
    PatchIn(&'static str),
}

/// A document store wrapper that injects timeouts on command.
///
/// Used to exercise the checkout failure tail: the wrapped store behaves
/// normally until armed, then fails the matching operation with
/// [`BackendError::Timeout`].
pub struct FlakyStore {
    inner: MemoryStore,
    fail_next: Mutex<Option<FailNext>>,
}

impl FlakyStore {
    #[must_use]
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_next: Mutex::new(None),
        }
    }

    /// Arm the next failure.
    pub fn arm(&self, failure: FailNext) {
        *self
            .fail_next
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(failure);
    }

    fn take_if(&self, expected: FailNext) -> bool {
        let mut armed = self
            .fail_next
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if *armed == Some(expected) {
            *armed = None;
            true
        } else {
            false
        }
    }
}

impl DocumentStore for FlakyStore {
    async fn create_or_replace(
        &self,
        collection: &str,
        key: &str,
        document: Value,
    ) -> Result<DateTime<Utc>, BackendError> {
        if let Some(static_name) = collection_name(collection)
            && self.take_if(FailNext::CreateIn(static_name))
        {
            return Err(BackendError::Timeout);
        }
        self.inner.create_or_replace(collection, key, document).await
    }

    async fn merge_patch(
        &self,
        collection: &str,
        key: &str,
        patch: Value,
    ) -> Result<DateTime<Utc>, BackendError> {
        if let Some(static_name) = collection_name(collection)
            && self.take_if(FailNext::PatchIn(static_name))
        {
            return Err(BackendError::Timeout);
        }
        self.inner.merge_patch(collection, key, patch).await
    }

    async fn read_by_key(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<Value>, BackendError> {
        self.inner.read_by_key(collection, key).await
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        order_by: Option<&OrderBy>,
    ) -> Result<Vec<StoredDocument>, BackendError> {
        self.inner.query(collection, filters, order_by).await
    }
}

fn collection_name(collection: &str) -> Option<&'static str> {
    use marigold_storefront::backend::collections;
    match collection {
        c if c == collections::USERS => Some(collections::USERS),
        c if c == collections::CARTS => Some(collections::CARTS),
        c if c == collections::ORDERS => Some(collections::ORDERS),
        _ => None,
    }
}
