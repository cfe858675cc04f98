//! Document store contract and REST client.
//!
//! The hosted document store is schemaless: each collection maps string keys
//! to JSON documents. The storefront only ever needs four operations, so the
//! trait is deliberately that small.
//!
//! # Write timestamps
//!
//! Write operations return the server-assigned write time. The store also
//! materializes a `createdAt` field into any written document that lacks
//! one, so creation time is always recorded server-side rather than from a
//! client clock.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use super::BackendError;
use crate::config::BackendConfig;

/// An equality predicate for [`DocumentStore::query`].
#[derive(Debug, Clone, Serialize)]
pub struct Filter {
    /// Top-level field to match.
    pub field: String,
    /// Value the field must equal.
    pub equals: Value,
}

impl Filter {
    /// Build an equality filter.
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            equals: value.into(),
        }
    }
}

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

/// Ordering clause for [`DocumentStore::query`].
#[derive(Debug, Clone, Serialize)]
pub struct OrderBy {
    /// Top-level field to order by.
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    /// Order ascending by `field`.
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    /// Order descending by `field`.
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }
}

/// A document returned from a query, together with its key.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredDocument {
    /// The document's key within its collection.
    pub key: String,
    /// The document body.
    pub data: Value,
}

/// The document store surface consumed by the storefront.
///
/// Implementations must treat a single document write as atomic; the
/// workflow's last-writer-wins semantics rely on it. An absent key on read
/// is `Ok(None)`, never an error.
pub trait DocumentStore: Send + Sync {
    /// Create or wholesale-replace the document at `collection/key`.
    ///
    /// Returns the server-assigned write timestamp.
    fn create_or_replace(
        &self,
        collection: &str,
        key: &str,
        document: Value,
    ) -> impl Future<Output = Result<DateTime<Utc>, BackendError>> + Send;

    /// Merge-patch the document at `collection/key` (RFC 7396 semantics:
    /// nested objects merge recursively, `null` removes a field). Creates
    /// the document when the key does not exist.
    fn merge_patch(
        &self,
        collection: &str,
        key: &str,
        patch: Value,
    ) -> impl Future<Output = Result<DateTime<Utc>, BackendError>> + Send;

    /// Read a document by key. Absent keys are `Ok(None)`.
    fn read_by_key(
        &self,
        collection: &str,
        key: &str,
    ) -> impl Future<Output = Result<Option<Value>, BackendError>> + Send;

    /// Query a collection by equality filters with optional ordering.
    fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        order_by: Option<&OrderBy>,
    ) -> impl Future<Output = Result<Vec<StoredDocument>, BackendError>> + Send;
}

// =============================================================================
// RestDocumentStore
// =============================================================================

/// Response body for write operations.
#[derive(Debug, Deserialize)]
struct WriteResponse {
    #[serde(rename = "writeTime")]
    write_time: DateTime<Utc>,
}

/// Request body for query operations.
#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    #[serde(rename = "where")]
    filters: &'a [Filter],
    #[serde(rename = "orderBy", skip_serializing_if = "Option::is_none")]
    order_by: Option<&'a OrderBy>,
}

/// Response body for query operations.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    documents: Vec<StoredDocument>,
}

/// HTTP client for the hosted document store.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct RestDocumentStore {
    inner: Arc<RestDocumentStoreInner>,
}

struct RestDocumentStoreInner {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestDocumentStore {
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
            inner: Arc::new(RestDocumentStoreInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_owned(),
                api_key: config.api_key.expose_secret().to_owned(),
            }),
        }
    }

    fn document_url(&self, collection: &str, key: &str) -> String {
        format!("{}/v1/{collection}/{key}", self.inner.base_url)
    }

    /// Send a request with auth headers and surface transport/backend errors.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, BackendError> {
        let response = request
            .bearer_auth(&self.inner.api_key)
            .send()
            .await
            .map_err(BackendError::from)?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(BackendError::RateLimited(super::retry_after_seconds(
                &response,
            )));
        }

        Ok(response)
    }

    /// Read a successful JSON body, mapping failures to structured errors.
    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let status = response.status();
        let body = response.text().await.map_err(BackendError::from)?;

        if !status.is_success() {
            return Err(super::error_from_response(status, &body));
        }

        serde_json::from_str(&body).map_err(BackendError::Parse)
    }
}

impl DocumentStore for RestDocumentStore {
    #[instrument(skip(self, document), fields(collection = %collection, key = %key))]
    async fn create_or_replace(
        &self,
        collection: &str,
        key: &str,
        document: Value,
    ) -> Result<DateTime<Utc>, BackendError> {
        let request = self
            .inner
            .client
            .put(self.document_url(collection, key))
            .json(&document);
        let response = self.send(request).await?;
        let write: WriteResponse = Self::read_json(response).await?;
        Ok(write.write_time)
    }

    #[instrument(skip(self, patch), fields(collection = %collection, key = %key))]
    async fn merge_patch(
        &self,
        collection: &str,
        key: &str,
        patch: Value,
    ) -> Result<DateTime<Utc>, BackendError> {
        let request = self
            .inner
            .client
            .patch(self.document_url(collection, key))
            .json(&patch);
        let response = self.send(request).await?;
        let write: WriteResponse = Self::read_json(response).await?;
        Ok(write.write_time)
    }

    #[instrument(skip(self), fields(collection = %collection, key = %key))]
    async fn read_by_key(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<Value>, BackendError> {
        let request = self.inner.client.get(self.document_url(collection, key));
        let response = self.send(request).await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let document: Value = Self::read_json(response).await?;
        Ok(Some(document))
    }

    #[instrument(skip(self, filters, order_by), fields(collection = %collection))]
    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        order_by: Option<&OrderBy>,
    ) -> Result<Vec<StoredDocument>, BackendError> {
        let body = QueryRequest { filters, order_by };
        let request = self
            .inner
            .client
            .post(format!("{}/v1/{collection}:query", self.inner.base_url))
            .json(&body);
        let response = self.send(request).await?;
        let result: QueryResponse = Self::read_json(response).await?;
        Ok(result.documents)
    }
}
