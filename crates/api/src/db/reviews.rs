//! Review repository.

use souq_core::forms::review::ReviewChanges;
use souq_core::models::Rating;
use souq_core::{ProductId, Review, ReviewId, StoreId, UserId};

use super::document::{Cursor, Direction, Document, Query, collections, patch_from};
use super::{DocumentStore, Listing, RepositoryError, decode, decode_opt, touch};

/// Upper bound on reviews read when recomputing an aggregate.
const AGGREGATE_PAGE: usize = 100;

/// Repository for product reviews.
pub struct ReviewRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Get a review by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the lookup fails.
    /// Returns `RepositoryError::DataCorruption` if the document does not decode.
    pub async fn get(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        let document = self.store.get(collections::REVIEWS, id.as_str()).await?;
        decode_opt(collections::REVIEWS, document)
    }

    /// The review `user_id` wrote for `product_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    pub async fn get_by_author(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<Option<Review>, RepositoryError> {
        let query = Query::new()
            .eq("productId", product_id.as_str())
            .eq("userId", user_id.as_str())
            .limit(1);
        let page = self.store.query(collections::REVIEWS, &query).await?;
        decode_opt(collections::REVIEWS, page.documents.into_iter().next())
    }

    /// Reviews of a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: &ProductId,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> Result<Listing<Review>, RepositoryError> {
        self.list("productId", product_id.as_str(), limit, cursor).await
    }

    /// Reviews written by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> Result<Listing<Review>, RepositoryError> {
        self.list("userId", user_id.as_str(), limit, cursor).await
    }

    async fn list(
        &self,
        field: &str,
        value: &str,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> Result<Listing<Review>, RepositoryError> {
        let query = Query::new()
            .eq(field, value)
            .order_by("createdAt", Direction::Desc)
            .limit(limit)
            .after(cursor);
        let page = self.store.query(collections::REVIEWS, &query).await?;
        Listing::from_page(collections::REVIEWS, page)
    }

    /// Every rating given to a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if a query fails.
    pub async fn ratings_for_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<Rating>, RepositoryError> {
        self.ratings("productId", product_id.as_str()).await
    }

    /// Every rating given to any product of a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if a query fails.
    pub async fn ratings_for_store(&self, store_id: &StoreId) -> Result<Vec<Rating>, RepositoryError> {
        self.ratings("storeId", store_id.as_str()).await
    }

    /// Walk every page matching `field == value`.
    async fn ratings(&self, field: &str, value: &str) -> Result<Vec<Rating>, RepositoryError> {
        let mut ratings = Vec::new();
        let mut cursor = None;
        loop {
            let query = Query::new()
                .eq(field, value)
                .limit(AGGREGATE_PAGE)
                .after(cursor);
            let page = self.store.query(collections::REVIEWS, &query).await?;
            let listing: Listing<Review> = Listing::from_page(collections::REVIEWS, page)?;
            ratings.extend(listing.items.iter().map(|r| r.rating));
            match listing.next_cursor {
                Some(next) => cursor = Some(next),
                None => return Ok(ratings),
            }
        }
    }

    /// Insert a new review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id is taken.
    pub async fn create(&self, review: &Review) -> Result<Review, RepositoryError> {
        let document = Document::from_entity(review)?;
        let stored = self.store.insert(collections::REVIEWS, document).await?;
        decode(collections::REVIEWS, stored)
    }

    /// Apply rating/comment changes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the update fails.
    pub async fn update(
        &self,
        id: &ReviewId,
        changes: &ReviewChanges,
    ) -> Result<Option<Review>, RepositoryError> {
        let patch = touch(patch_from(changes)?);
        let document = self
            .store
            .update(collections::REVIEWS, id.as_str(), patch)
            .await?;
        decode_opt(collections::REVIEWS, document)
    }

    /// Delete a review; `false` when it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the delete fails.
    pub async fn delete(&self, id: &ReviewId) -> Result<bool, RepositoryError> {
        Ok(self.store.delete(collections::REVIEWS, id.as_str()).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use souq_core::Timestamp;

    use super::*;
    use crate::db::MemoryDocumentStore;

    fn review(id: &str, user: &str, product: &str, rating: i64) -> Review {
        let now = Timestamp::now();
        Review {
            id: ReviewId::new(id),
            product_id: ProductId::new(product),
            store_id: StoreId::new("s1"),
            user_id: UserId::new(user),
            user_name: "Huda".to_string(),
            rating: Rating::new(rating).unwrap(),
            comment: None,
            verified_purchase: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_get_by_author() {
        let docs = MemoryDocumentStore::new();
        let repo = ReviewRepository::new(&docs);
        repo.create(&review("r1", "u1", "p1", 5)).await.unwrap();

        let u1 = UserId::new("u1");
        assert!(repo.get_by_author(&u1, &ProductId::new("p1")).await.unwrap().is_some());
        assert!(repo.get_by_author(&u1, &ProductId::new("p2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ratings_walk_every_page() {
        let docs = MemoryDocumentStore::new();
        let repo = ReviewRepository::new(&docs);
        for i in 0..(AGGREGATE_PAGE + 5) {
            let rating = i64::try_from(i % 5).unwrap() + 1;
            repo.create(&review(&format!("r{i:03}"), &format!("u{i}"), "p1", rating))
                .await
                .unwrap();
        }
        repo.create(&review("other", "u1", "p2", 1)).await.unwrap();

        let ratings = repo.ratings_for_product(&ProductId::new("p1")).await.unwrap();
        assert_eq!(ratings.len(), AGGREGATE_PAGE + 5);
        assert_eq!(
            repo.ratings_for_store(&StoreId::new("s1")).await.unwrap().len(),
            AGGREGATE_PAGE + 6
        );
    }
}
