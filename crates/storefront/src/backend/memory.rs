//! In-memory backend implementing the collaborator contracts.
//!
//! Used by the integration tests and by local development without a hosted
//! project. One [`MemoryBackend`] is the shared platform state (accounts +
//! collections); [`MemoryBackend::identity`] hands out per-actor identity
//! handles with their own current session over the shared accounts, which
//! is the "two browser tabs, one user" topology the workflow's
//! last-writer-wins semantics are defined against.
//!
//! Error codes match the hosted identity provider (`EMAIL_EXISTS`,
//! `WEAK_PASSWORD`, `EMAIL_NOT_FOUND`, `INVALID_PASSWORD`, ...) so the
//! session layer maps both backends identically.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::Value;

use marigold_core::{Email, UserId};

use super::identity::SessionChannel;
use super::{
    BackendError, DocumentStore, Filter, Identity, IdentityProvider, OrderBy, SessionChanges,
    StoredDocument,
};

/// Minimum password length enforced by the (simulated) provider policy.
///
/// The hosted provider enforces 6; the registration form is stricter (8).
const PROVIDER_MIN_PASSWORD: usize = 6;

#[derive(Debug, Clone)]
struct MemoryAccount {
    uid: UserId,
    email: Email,
    password: String,
    display_name: Option<String>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    /// Accounts keyed by email.
    accounts: Mutex<HashMap<String, MemoryAccount>>,
    /// Collections of key -> document.
    collections: Mutex<HashMap<String, BTreeMap<String, Value>>>,
    next_uid: AtomicU64,
}

/// Shared in-memory platform state.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh identity handle with its own current session.
    #[must_use]
    pub fn identity(&self) -> MemoryIdentity {
        MemoryIdentity {
            inner: Arc::clone(&self.inner),
            session: SessionChannel::new(),
        }
    }

    /// A document store handle.
    #[must_use]
    pub fn store(&self) -> MemoryStore {
        MemoryStore {
            inner: Arc::clone(&self.inner),
        }
    }
}

// =============================================================================
// MemoryIdentity
// =============================================================================

/// One actor's identity handle over the shared accounts.
#[derive(Debug)]
pub struct MemoryIdentity {
    inner: Arc<MemoryInner>,
    session: SessionChannel,
}

fn provider_error(code: &str) -> BackendError {
    BackendError::Api {
        status: 400,
        code: code.to_owned(),
        message: code.to_owned(),
    }
}

impl MemoryIdentity {
    fn identity_of(account: &MemoryAccount) -> Identity {
        Identity {
            uid: account.uid.clone(),
            email: account.email.clone(),
            display_name: account.display_name.clone(),
        }
    }

    fn accounts(&self) -> std::sync::MutexGuard<'_, HashMap<String, MemoryAccount>> {
        // A poisoned lock means a test thread panicked mid-write; the data
        // is still usable for the remaining assertions.
        self.inner
            .accounts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl IdentityProvider for MemoryIdentity {
    async fn register(&self, email: &Email, password: &str) -> Result<Identity, BackendError> {
        if password.len() < PROVIDER_MIN_PASSWORD {
            return Err(provider_error("WEAK_PASSWORD"));
        }

        let identity = {
            let mut accounts = self.accounts();
            if accounts.contains_key(email.as_str()) {
                return Err(provider_error("EMAIL_EXISTS"));
            }

            let uid = UserId::new(format!(
                "mem-{}",
                self.inner.next_uid.fetch_add(1, Ordering::Relaxed) + 1
            ));
            let account = MemoryAccount {
                uid,
                email: email.clone(),
                password: password.to_owned(),
                display_name: None,
            };
            let identity = Self::identity_of(&account);
            accounts.insert(email.as_str().to_owned(), account);
            identity
        };

        self.session.announce(Some(identity.clone()));
        Ok(identity)
    }

    async fn set_display_name(&self, uid: &UserId, name: &str) -> Result<(), BackendError> {
        {
            let mut accounts = self.accounts();
            let account = accounts
                .values_mut()
                .find(|a| a.uid == *uid)
                .ok_or_else(|| provider_error("EMAIL_NOT_FOUND"))?;
            account.display_name = Some(name.to_owned());
        }

        if let Some(mut identity) = self.session.current()
            && identity.uid == *uid
        {
            identity.display_name = Some(name.to_owned());
            self.session.announce(Some(identity));
        }

        Ok(())
    }

    async fn login(&self, email: &Email, password: &str) -> Result<Identity, BackendError> {
        let identity = {
            let accounts = self.accounts();
            let account = accounts
                .get(email.as_str())
                .ok_or_else(|| provider_error("EMAIL_NOT_FOUND"))?;
            if account.password != password {
                return Err(provider_error("INVALID_PASSWORD"));
            }
            Self::identity_of(account)
        };

        self.session.announce(Some(identity.clone()));
        Ok(identity)
    }

    async fn logout(&self) -> Result<(), BackendError> {
        self.session.announce(None);
        Ok(())
    }

    async fn resolve(&self) -> Result<Option<Identity>, BackendError> {
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

// =============================================================================
// MemoryStore
// =============================================================================

/// Document store handle over the shared collections.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    fn collections(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, BTreeMap<String, Value>>> {
        self.inner
            .collections
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// RFC 7396 merge patch: objects merge recursively, `null` removes.
fn apply_merge_patch(target: &mut Value, patch: &Value) {
    if let Value::Object(patch_map) = patch {
        if !target.is_object() {
            *target = Value::Object(serde_json::Map::new());
        }
        if let Value::Object(target_map) = target {
            for (key, value) in patch_map {
                if value.is_null() {
                    target_map.remove(key);
                } else if let Some(existing) = target_map.get_mut(key) {
                    apply_merge_patch(existing, value);
                } else {
                    target_map.insert(key.clone(), value.clone());
                }
            }
        }
    } else {
        *target = patch.clone();
    }
}

/// Stamp `createdAt` with the write time when the document lacks it.
fn stamp_created_at(document: &mut Value, now: DateTime<Utc>) {
    if let Value::Object(map) = document
        && !map.contains_key("createdAt")
    {
        map.insert("createdAt".to_owned(), Value::String(now.to_rfc3339()));
    }
}

/// Compare two JSON values for ordering purposes.
///
/// RFC 3339 strings compare as instants (string comparison would misorder
/// timestamps with differing subsecond precision), numbers numerically,
/// everything else by string form.
fn compare_json(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering as O;

    if let (Value::String(sa), Value::String(sb)) = (a, b)
        && let (Ok(ta), Ok(tb)) = (
            DateTime::parse_from_rfc3339(sa),
            DateTime::parse_from_rfc3339(sb),
        )
    {
        return ta.cmp(&tb);
    }

    if let (Some(na), Some(nb)) = (a.as_f64(), b.as_f64()) {
        return na.partial_cmp(&nb).unwrap_or(O::Equal);
    }

    a.to_string().cmp(&b.to_string())
}

impl DocumentStore for MemoryStore {
    async fn create_or_replace(
        &self,
        collection: &str,
        key: &str,
        mut document: Value,
    ) -> Result<DateTime<Utc>, BackendError> {
        let now = Utc::now();
        stamp_created_at(&mut document, now);
        self.collections()
            .entry(collection.to_owned())
            .or_default()
            .insert(key.to_owned(), document);
        Ok(now)
    }

    async fn merge_patch(
        &self,
        collection: &str,
        key: &str,
        patch: Value,
    ) -> Result<DateTime<Utc>, BackendError> {
        let now = Utc::now();
        let mut collections = self.collections();
        let documents = collections.entry(collection.to_owned()).or_default();
        let entry = documents
            .entry(key.to_owned())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        apply_merge_patch(entry, &patch);
        stamp_created_at(entry, now);
        Ok(now)
    }

    async fn read_by_key(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<Value>, BackendError> {
        Ok(self
            .collections()
            .get(collection)
            .and_then(|documents| documents.get(key))
            .cloned())
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        order_by: Option<&OrderBy>,
    ) -> Result<Vec<StoredDocument>, BackendError> {
        let collections = self.collections();
        let mut results: Vec<StoredDocument> = collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|(_, data)| {
                        filters.iter().all(|filter| {
                            data.get(&filter.field) == Some(&filter.equals)
                        })
                    })
                    .map(|(key, data)| StoredDocument {
                        key: key.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = order_by {
            let missing = Value::Null;
            results.sort_by(|a, b| {
                let va = a.data.get(&order.field).unwrap_or(&missing);
                let vb = b.data.get(&order.field).unwrap_or(&missing);
                let ordering = compare_json(va, vb);
                match order.direction {
                    super::Direction::Ascending => ordering,
                    super::Direction::Descending => ordering.reverse(),
                }
            });
        }

        Ok(results)
    }
}
