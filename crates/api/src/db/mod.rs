//! Document store and repositories.
//!
//! # Backends
//!
//! - [`PgDocumentStore`] - `PostgreSQL` `documents` table with a JSONB body
//! - [`MemoryDocumentStore`] - in-process map for tests and local development
//!
//! Both implement [`DocumentStore`] with identical filter, ordering and
//! pagination semantics. Repositories wrap a `&dyn DocumentStore` and convert
//! documents to and from the `souq-core` entities.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p souq-cli -- migrate
//! ```

pub mod coupons;
pub mod document;
pub mod memory;
pub mod orders;
pub mod postgres;
pub mod products;
pub mod reviews;
pub mod sessions;
pub mod stores;
pub mod users;
pub mod wishlist;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use souq_core::Timestamp;

pub use coupons::CouponRepository;
pub use document::{
    Cursor, Direction, Document, Filter, FilterOp, OrderBy, Page, Patch, Query, collections,
};
pub use memory::MemoryDocumentStore;
pub use orders::OrderRepository;
pub use postgres::PgDocumentStore;
pub use products::ProductRepository;
pub use reviews::ReviewRepository;
pub use sessions::DocumentSessionStore;
pub use stores::StoreRepository;
pub use users::UserRepository;
pub use wishlist::WishlistRepository;

/// Errors raised by a document store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A document with the same id already exists.
    #[error("document {id} already exists in {collection}")]
    Conflict { collection: String, id: String },

    /// The pagination cursor could not be decoded.
    #[error("invalid cursor")]
    InvalidCursor,

    /// The document is not an object with a string id.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// A field name is not a plain identifier.
    #[error("invalid field name: {0}")]
    InvalidField(String),

    /// The query is malformed.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// `increment` on a field holding something other than a number.
    #[error("field {0} is not numeric")]
    NotNumeric(String),
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Document store failure.
    #[error("store error: {0}")]
    Store(#[source] StoreError),

    /// Data in the store does not decode into the entity type.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Uniqueness violation (e.g., duplicate email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { collection, id } => {
                Self::Conflict(format!("{collection}/{id} already exists"))
            }
            other => Self::Store(other),
        }
    }
}

impl RepositoryError {
    /// Wrap a decode failure for `collection`.
    pub(crate) fn corrupt(collection: &str, err: &serde_json::Error) -> Self {
        Self::DataCorruption(format!("invalid document in {collection}: {err}"))
    }
}

/// Decode one document from `collection`.
pub(crate) fn decode<T: DeserializeOwned>(
    collection: &str,
    document: Document,
) -> Result<T, RepositoryError> {
    document
        .decode()
        .map_err(|e| RepositoryError::corrupt(collection, &e))
}

/// Decode an optional document from `collection`.
pub(crate) fn decode_opt<T: DeserializeOwned>(
    collection: &str,
    document: Option<Document>,
) -> Result<Option<T>, RepositoryError> {
    document.map(|d| decode(collection, d)).transpose()
}

/// Set `updatedAt` on a patch.
pub(crate) fn touch(mut patch: Patch) -> Patch {
    patch.insert(
        "updatedAt".to_string(),
        Value::String(Timestamp::now().to_rfc3339()),
    );
    patch
}

/// One page of decoded entities.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<Cursor>,
}

impl<T: DeserializeOwned> Listing<T> {
    /// Decode a page from `collection`.
    pub(crate) fn from_page(collection: &str, page: Page) -> Result<Self, RepositoryError> {
        let (items, next_cursor) = page
            .decode()
            .map_err(|e| RepositoryError::corrupt(collection, &e))?;
        Ok(Self { items, next_cursor })
    }
}

impl<T> Listing<T> {
    /// Transform every item, keeping the cursor.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Listing<U> {
        Listing {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}

/// A document database with filtered, cursor-paginated queries.
///
/// Multi-document operations are not transactional. `increment` and `push`
/// are atomic for a single document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by id.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Insert a new document, failing with `StoreError::Conflict` if the id exists.
    async fn insert(&self, collection: &str, document: Document) -> Result<Document, StoreError>;

    /// Shallow-merge `patch` into a document. The `id` field never changes.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Patch,
    ) -> Result<Option<Document>, StoreError>;

    /// Delete a document; `false` when it did not exist.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// Run a query and return one page.
    async fn query(&self, collection: &str, query: &Query) -> Result<Page, StoreError>;

    /// Count documents matching every filter.
    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64, StoreError>;

    /// Add `delta` to a numeric field; a missing field counts as zero.
    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<Option<Document>, StoreError>;

    /// Append `value` to an array field, creating it when missing.
    async fn push(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<Option<Document>, StoreError>;

    /// Check the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
