//! Coupon repository.

use souq_core::forms::coupon::CouponChanges;
use souq_core::{Coupon, CouponId, CouponStatus, StoreId};

use super::document::{Cursor, Direction, Document, Query, collections, patch_from};
use super::{DocumentStore, Listing, RepositoryError, decode, decode_opt, touch};

/// Repository for store coupons.
pub struct CouponRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> CouponRepository<'a> {
    /// Create a new coupon repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Get a coupon by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the lookup fails.
    /// Returns `RepositoryError::DataCorruption` if the document does not decode.
    pub async fn get(&self, id: &CouponId) -> Result<Option<Coupon>, RepositoryError> {
        let document = self.store.get(collections::COUPONS, id.as_str()).await?;
        decode_opt(collections::COUPONS, document)
    }

    /// The coupon with normalized `code` in `store_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    pub async fn get_by_code(
        &self,
        store_id: &StoreId,
        code: &str,
    ) -> Result<Option<Coupon>, RepositoryError> {
        let query = Query::new()
            .eq("storeId", store_id.as_str())
            .eq("code", code)
            .limit(1);
        let page = self.store.query(collections::COUPONS, &query).await?;
        decode_opt(collections::COUPONS, page.documents.into_iter().next())
    }

    /// A store's coupons, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    pub async fn list(
        &self,
        store_id: Option<&StoreId>,
        status: Option<CouponStatus>,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> Result<Listing<Coupon>, RepositoryError> {
        let mut query = Query::new()
            .order_by("createdAt", Direction::Desc)
            .limit(limit)
            .after(cursor);
        if let Some(store_id) = store_id {
            query = query.eq("storeId", store_id.as_str());
        }
        if let Some(status) = status {
            query = query.eq("status", status.as_str());
        }
        let page = self.store.query(collections::COUPONS, &query).await?;
        Listing::from_page(collections::COUPONS, page)
    }

    /// Insert a new coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id is taken.
    pub async fn create(&self, coupon: &Coupon) -> Result<Coupon, RepositoryError> {
        let document = Document::from_entity(coupon)?;
        let stored = self.store.insert(collections::COUPONS, document).await?;
        decode(collections::COUPONS, stored)
    }

    /// Apply coupon changes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the update fails.
    pub async fn update(
        &self,
        id: &CouponId,
        changes: &CouponChanges,
    ) -> Result<Option<Coupon>, RepositoryError> {
        let patch = touch(patch_from(changes)?);
        let document = self
            .store
            .update(collections::COUPONS, id.as_str(), patch)
            .await?;
        decode_opt(collections::COUPONS, document)
    }

    /// Count one redemption.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the update fails.
    pub async fn record_use(&self, id: &CouponId) -> Result<bool, RepositoryError> {
        let document = self
            .store
            .increment(collections::COUPONS, id.as_str(), "usedCount", 1)
            .await?;
        Ok(document.is_some())
    }

    /// Delete a coupon; `false` when it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the delete fails.
    pub async fn delete(&self, id: &CouponId) -> Result<bool, RepositoryError> {
        Ok(self.store.delete(collections::COUPONS, id.as_str()).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use souq_core::{DiscountType, Timestamp};

    use super::*;
    use crate::db::MemoryDocumentStore;

    fn coupon(id: &str, store: &str, code: &str) -> Coupon {
        let now = Timestamp::now();
        Coupon {
            id: CouponId::new(id),
            store_id: StoreId::new(store),
            code: code.to_string(),
            discount_type: DiscountType::Percentage,
            value: Decimal::from(10),
            min_order_amount: None,
            max_discount: None,
            usage_limit: Some(2),
            used_count: 0,
            starts_at: None,
            expires_at: None,
            status: CouponStatus::Active,
            product_ids: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_code_is_scoped_to_store() {
        let docs = MemoryDocumentStore::new();
        let repo = CouponRepository::new(&docs);
        repo.create(&coupon("c1", "s1", "EID10")).await.unwrap();
        repo.create(&coupon("c2", "s2", "EID10")).await.unwrap();

        let found = repo
            .get_by_code(&StoreId::new("s2"), "EID10")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, CouponId::new("c2"));
        assert!(
            repo.get_by_code(&StoreId::new("s3"), "EID10")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_record_use_exhausts() {
        let docs = MemoryDocumentStore::new();
        let repo = CouponRepository::new(&docs);
        repo.create(&coupon("c1", "s1", "EID10")).await.unwrap();
        let id = CouponId::new("c1");

        repo.record_use(&id).await.unwrap();
        repo.record_use(&id).await.unwrap();
        let c = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(c.used_count, 2);
        assert!(c.is_exhausted());
    }

    #[tokio::test]
    async fn test_list_by_store_and_status() {
        let docs = MemoryDocumentStore::new();
        let repo = CouponRepository::new(&docs);
        repo.create(&coupon("c1", "s1", "A1B")).await.unwrap();
        let mut inactive = coupon("c2", "s1", "B2C");
        inactive.status = CouponStatus::Inactive;
        repo.create(&inactive).await.unwrap();

        let s1 = StoreId::new("s1");
        let all = repo.list(Some(&s1), None, 20, None).await.unwrap();
        assert_eq!(all.items.len(), 2);
        let active = repo
            .list(Some(&s1), Some(CouponStatus::Active), 20, None)
            .await
            .unwrap();
        assert_eq!(active.items.len(), 1);
    }
}
