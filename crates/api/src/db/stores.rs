//! Store repository.

use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;

use souq_core::forms::store::StoreChanges;
use souq_core::models::RatingSummary;
use souq_core::{Store, StoreId, StoreStatus, UserId};

use super::document::{Cursor, Direction, Document, Filter, FilterOp, Query, collections, patch_from};
use super::{DocumentStore, Listing, Patch, RepositoryError, decode, decode_opt, touch};

/// Repository for seller stores.
pub struct StoreRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> StoreRepository<'a> {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Get a store by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the lookup fails.
    /// Returns `RepositoryError::DataCorruption` if the document does not decode.
    pub async fn get(&self, id: &StoreId) -> Result<Option<Store>, RepositoryError> {
        let document = self.store.get(collections::STORES, id.as_str()).await?;
        decode_opt(collections::STORES, document)
    }

    /// The store owned by `owner`, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    pub async fn get_by_owner(&self, owner: &UserId) -> Result<Option<Store>, RepositoryError> {
        self.first(Query::new().eq("ownerId", owner.as_str())).await
    }

    /// The store with `slug`, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Store>, RepositoryError> {
        self.first(Query::new().eq("slug", slug)).await
    }

    async fn first(&self, query: Query) -> Result<Option<Store>, RepositoryError> {
        let page = self.store.query(collections::STORES, &query.limit(1)).await?;
        decode_opt(collections::STORES, page.documents.into_iter().next())
    }

    /// Stores newest first, optionally with one status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    pub async fn list(
        &self,
        status: Option<StoreStatus>,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> Result<Listing<Store>, RepositoryError> {
        let mut query = Query::new()
            .order_by("createdAt", Direction::Desc)
            .limit(limit)
            .after(cursor);
        if let Some(status) = status {
            query = query.eq("status", status.as_str());
        }
        let page = self.store.query(collections::STORES, &query).await?;
        Listing::from_page(collections::STORES, page)
    }

    /// Insert a new store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id or slug is taken.
    pub async fn create(&self, store: &Store) -> Result<Store, RepositoryError> {
        let document = Document::from_entity(store)?;
        let stored = self.store.insert(collections::STORES, document).await?;
        decode(collections::STORES, stored)
    }

    /// Apply profile changes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a new slug is taken.
    pub async fn update(
        &self,
        id: &StoreId,
        changes: &StoreChanges,
    ) -> Result<Option<Store>, RepositoryError> {
        self.patch(id, patch_from(changes)?).await
    }

    /// Change the approval status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the update fails.
    pub async fn set_status(
        &self,
        id: &StoreId,
        status: StoreStatus,
    ) -> Result<Option<Store>, RepositoryError> {
        let mut patch = Patch::new();
        patch.insert("status".to_string(), Value::String(status.as_str().to_string()));
        self.patch(id, patch).await
    }

    /// Store the rating aggregate across the store's reviews.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the update fails.
    pub async fn set_rating(
        &self,
        id: &StoreId,
        summary: RatingSummary,
    ) -> Result<Option<Store>, RepositoryError> {
        self.patch(id, rating_patch(summary)).await
    }

    async fn patch(&self, id: &StoreId, patch: Patch) -> Result<Option<Store>, RepositoryError> {
        let document = self
            .store
            .update(collections::STORES, id.as_str(), touch(patch))
            .await?;
        decode_opt(collections::STORES, document)
    }

    /// Delete a store; `false` when it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the delete fails.
    pub async fn delete(&self, id: &StoreId) -> Result<bool, RepositoryError> {
        Ok(self.store.delete(collections::STORES, id.as_str()).await?)
    }

    /// Number of stores with `status`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the count fails.
    pub async fn count_by_status(&self, status: StoreStatus) -> Result<u64, RepositoryError> {
        let filter = Filter {
            field: "status".to_string(),
            op: FilterOp::Eq,
            value: Value::String(status.as_str().to_string()),
        };
        Ok(self.store.count(collections::STORES, &[filter]).await?)
    }
}

/// `{rating, reviewCount}` patch shared by stores and products.
pub(crate) fn rating_patch(summary: RatingSummary) -> Patch {
    let mut patch = Patch::new();
    patch.insert(
        "rating".to_string(),
        summary
            .rating
            .to_f64()
            .map_or(Value::from(0), Value::from),
    );
    patch.insert("reviewCount".to_string(), Value::from(summary.review_count));
    patch
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use souq_core::{LocalizedText, Money, Timestamp};

    use super::*;
    use crate::db::MemoryDocumentStore;

    fn store(id: &str, owner: &str, slug: &str, status: StoreStatus) -> Store {
        let now = Timestamp::now();
        Store {
            id: StoreId::new(id),
            owner_id: UserId::new(owner),
            name: LocalizedText::new("متجر", "Store"),
            slug: slug.to_string(),
            description: LocalizedText::default(),
            logo_url: None,
            city: Some("Jeddah".to_string()),
            phone: None,
            shipping_fee: Money::from_minor(1500),
            status,
            rating: rust_decimal::Decimal::ZERO,
            review_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_lookup_by_owner_and_slug() {
        let docs = MemoryDocumentStore::new();
        let repo = StoreRepository::new(&docs);
        repo.create(&store("s1", "u1", "dates-house", StoreStatus::Pending))
            .await
            .unwrap();

        let by_owner = repo.get_by_owner(&UserId::new("u1")).await.unwrap().unwrap();
        assert_eq!(by_owner.slug, "dates-house");
        assert!(repo.get_by_slug("dates-house").await.unwrap().is_some());
        assert!(repo.get_by_slug("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_status() {
        let docs = MemoryDocumentStore::new();
        let repo = StoreRepository::new(&docs);
        repo.create(&store("s1", "u1", "one", StoreStatus::Active)).await.unwrap();
        repo.create(&store("s2", "u2", "two", StoreStatus::Pending)).await.unwrap();
        repo.create(&store("s3", "u3", "three", StoreStatus::Active)).await.unwrap();

        let active = repo.list(Some(StoreStatus::Active), 20, None).await.unwrap();
        assert_eq!(active.items.len(), 2);
        assert!(active.items.iter().all(Store::is_active));
        assert_eq!(repo.count_by_status(StoreStatus::Pending).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_set_status_and_rating() {
        let docs = MemoryDocumentStore::new();
        let repo = StoreRepository::new(&docs);
        repo.create(&store("s1", "u1", "one", StoreStatus::Pending)).await.unwrap();

        let id = StoreId::new("s1");
        let updated = repo.set_status(&id, StoreStatus::Active).await.unwrap().unwrap();
        assert!(updated.is_active());

        let summary = RatingSummary {
            rating: rust_decimal::Decimal::new(425, 2),
            review_count: 4,
        };
        let rated = repo.set_rating(&id, summary).await.unwrap().unwrap();
        assert_eq!(rated.rating, rust_decimal::Decimal::new(425, 2));
        assert_eq!(rated.review_count, 4);
    }
}
