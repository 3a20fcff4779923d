//! Wishlist repository.
//!
//! Items are keyed by `{userId}_{productId}`, so adding the same product
//! twice finds the existing document instead of creating a duplicate.

use souq_core::{ProductId, UserId, WishlistItem, WishlistItemId};

use super::document::{Cursor, Direction, Document, Query, collections};
use super::{DocumentStore, Listing, RepositoryError, decode, decode_opt};

/// Repository for wishlist items.
pub struct WishlistRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// A user's saved items, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    pub async fn list(
        &self,
        user_id: &UserId,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> Result<Listing<WishlistItem>, RepositoryError> {
        let query = Query::new()
            .eq("userId", user_id.as_str())
            .order_by("createdAt", Direction::Desc)
            .limit(limit)
            .after(cursor);
        let page = self.store.query(collections::WISHLIST, &query).await?;
        Listing::from_page(collections::WISHLIST, page)
    }

    /// Save a product, returning the existing item when already saved.
    ///
    /// Returns `(item, created)`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if a read or write fails.
    pub async fn add(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<(WishlistItem, bool), RepositoryError> {
        let id = WishlistItemId::for_pair(user_id, product_id);
        if let Some(existing) = self.get(&id).await? {
            return Ok((existing, false));
        }

        let item = WishlistItem::new(user_id.clone(), product_id.clone());
        let document = Document::from_entity(&item)?;
        match self.store.insert(collections::WISHLIST, document).await {
            Ok(stored) => Ok((decode(collections::WISHLIST, stored)?, true)),
            // Lost a race with a concurrent add of the same pair.
            Err(super::StoreError::Conflict { .. }) => match self.get(&id).await? {
                Some(existing) => Ok((existing, false)),
                None => Err(RepositoryError::NotFound),
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, id: &WishlistItemId) -> Result<Option<WishlistItem>, RepositoryError> {
        let document = self.store.get(collections::WISHLIST, id.as_str()).await?;
        decode_opt(collections::WISHLIST, document)
    }

    /// Remove a saved product; `false` when it was not saved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the delete fails.
    pub async fn remove(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<bool, RepositoryError> {
        let id = WishlistItemId::for_pair(user_id, product_id);
        Ok(self.store.delete(collections::WISHLIST, id.as_str()).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryDocumentStore;

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let docs = MemoryDocumentStore::new();
        let repo = WishlistRepository::new(&docs);
        let (user, product) = (UserId::new("u1"), ProductId::new("p1"));

        let (first, created) = repo.add(&user, &product).await.unwrap();
        assert!(created);
        let (second, created) = repo.add(&user, &product).await.unwrap();
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(repo.list(&user, 20, None).await.unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let docs = MemoryDocumentStore::new();
        let repo = WishlistRepository::new(&docs);
        let (user, product) = (UserId::new("u1"), ProductId::new("p1"));

        repo.add(&user, &product).await.unwrap();
        assert!(repo.remove(&user, &product).await.unwrap());
        assert!(!repo.remove(&user, &product).await.unwrap());
        assert!(repo.list(&user, 20, None).await.unwrap().items.is_empty());
    }
}
