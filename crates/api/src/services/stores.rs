//! Seller stores: creation, moderation and the read-through cache.

use tracing::{info, instrument};

use souq_core::forms::ValidationErrors;
use souq_core::forms::Violation;
use souq_core::forms::store::{NewStore, StoreChanges};
use souq_core::{Store, StoreId, StoreStatus, Timestamp, UserRole};

use crate::db::{StoreRepository, UserRepository};
use crate::error::{AppError, Entity, Result, messages};
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// Store operations.
pub struct StoreService<'a> {
    state: &'a AppState,
    stores: StoreRepository<'a>,
}

impl<'a> StoreService<'a> {
    #[must_use]
    pub fn new(state: &'a AppState) -> Self {
        Self {
            state,
            stores: StoreRepository::new(state.documents()),
        }
    }

    /// Load a store, from the cache when possible.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the lookup fails.
    pub async fn get(&self, id: &StoreId) -> Result<Option<Store>> {
        let cache = self.state.store_cache();
        if let Some(store) = cache.get(id).await {
            return Ok(Some(store));
        }
        let store = self.stores.get(id).await?;
        if let Some(store) = &store {
            cache.insert(id.clone(), store.clone()).await;
        }
        Ok(store)
    }

    /// Load a store or fail with 404.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` when the store does not exist.
    pub async fn require(&self, id: &StoreId) -> Result<Store> {
        self.get(id).await?.ok_or(AppError::NotFound(Entity::Store))
    }

    /// A store as seen by `viewer`: inactive stores are hidden from everyone
    /// but their owner and admins.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` when the store is missing or hidden.
    pub async fn visible(&self, id: &StoreId, viewer: Option<&CurrentUser>) -> Result<Store> {
        let store = self.require(id).await?;
        if store.is_active() || viewer.is_some_and(|v| can_manage(v, &store)) {
            Ok(store)
        } else {
            Err(AppError::NotFound(Entity::Store))
        }
    }

    /// Drop a cached store after a write.
    pub async fn invalidate(&self, id: &StoreId) {
        self.state.store_cache().invalidate(id).await;
    }

    /// The store a seller manages catalog data for.
    ///
    /// Admins must name the store; sellers always get their own and may not
    /// name another.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` when an admin names no store,
    /// `AppError::BadRequest` when a seller has no store yet, and
    /// `AppError::Forbidden` when a seller names someone else's store.
    pub async fn managed_by(
        &self,
        actor: &CurrentUser,
        requested: Option<&StoreId>,
    ) -> Result<Store> {
        if actor.is_admin() {
            let id = requested
                .ok_or_else(|| ValidationErrors::single("storeId", Violation::Required))?;
            return self.require(id).await;
        }

        let store = self
            .stores
            .get_by_owner(&actor.id)
            .await?
            .ok_or(AppError::BadRequest(messages::NO_STORE))?;
        if requested.is_some_and(|id| *id != store.id) {
            return Err(AppError::Forbidden);
        }
        Ok(store)
    }

    /// Open a store for `owner`. Customers are promoted to sellers.
    ///
    /// Returns the store and the owner's role afterwards.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` when the owner already has a store or the
    /// slug is taken.
    #[instrument(skip(self, new), fields(owner = %owner.id, slug = %new.slug))]
    pub async fn create(&self, owner: &CurrentUser, new: NewStore) -> Result<(Store, UserRole)> {
        if self.stores.get_by_owner(&owner.id).await?.is_some() {
            return Err(AppError::Conflict(messages::STORE_EXISTS));
        }
        if self.stores.get_by_slug(&new.slug).await?.is_some() {
            return Err(AppError::Conflict(messages::SLUG_TAKEN));
        }

        let now = Timestamp::now();
        let store = Store {
            id: StoreId::generate(),
            owner_id: owner.id.clone(),
            name: new.name,
            slug: new.slug,
            description: new.description,
            logo_url: new.logo_url,
            city: new.city,
            phone: new.phone,
            shipping_fee: new.shipping_fee,
            status: StoreStatus::Pending,
            rating: rust_decimal::Decimal::ZERO,
            review_count: 0,
            created_at: now,
            updated_at: now,
        };
        let store = self.stores.create(&store).await?;

        let mut role = owner.role;
        if role == UserRole::Customer {
            UserRepository::new(self.state.documents())
                .set_role(&owner.id, UserRole::Seller)
                .await?;
            role = UserRole::Seller;
        }

        info!(store_id = %store.id, "Store created");
        Ok((store, role))
    }

    /// Apply profile changes. The status is not touched.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` unless `actor` owns the store or is an
    /// admin, and `AppError::Conflict` when a new slug is taken.
    #[instrument(skip(self, actor, changes), fields(store_id = %id))]
    pub async fn update(
        &self,
        actor: &CurrentUser,
        id: &StoreId,
        changes: &StoreChanges,
    ) -> Result<Store> {
        let current = self.require(id).await?;
        if !can_manage(actor, &current) {
            return Err(AppError::Forbidden);
        }
        if let Some(slug) = &changes.slug
            && *slug != current.slug
            && self.stores.get_by_slug(slug).await?.is_some()
        {
            return Err(AppError::Conflict(messages::SLUG_TAKEN));
        }

        let updated = self.stores.update(id, changes).await?;
        self.invalidate(id).await;
        updated.ok_or(AppError::NotFound(Entity::Store))
    }

    /// Approve or suspend a store.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` when the move is not allowed.
    #[instrument(skip(self), fields(store_id = %id))]
    pub async fn set_status(&self, id: &StoreId, status: StoreStatus) -> Result<Store> {
        let current = self.require(id).await?;
        if !current.status.can_transition_to(status) {
            return Err(AppError::BadRequest(messages::INVALID_STORE_STATUS));
        }

        let updated = self.stores.set_status(id, status).await?;
        self.invalidate(id).await;
        info!(from = %current.status, to = %status, "Store status changed");
        updated.ok_or(AppError::NotFound(Entity::Store))
    }

    /// Delete a store.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` when the store does not exist.
    #[instrument(skip(self), fields(store_id = %id))]
    pub async fn delete(&self, id: &StoreId) -> Result<()> {
        let deleted = self.stores.delete(id).await?;
        self.invalidate(id).await;
        if deleted {
            Ok(())
        } else {
            Err(AppError::NotFound(Entity::Store))
        }
    }
}

/// Whether `actor` may manage `store`.
#[must_use]
pub fn can_manage(actor: &CurrentUser, store: &Store) -> bool {
    actor.is_admin() || store.is_owned_by(&actor.id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use souq_core::{Email, LocalizedText, Money, UserId};

    use super::*;
    use crate::config::ApiConfig;
    use crate::db::MemoryDocumentStore;

    fn state() -> AppState {
        AppState::new(ApiConfig::for_memory(), Arc::new(MemoryDocumentStore::new()))
    }

    fn user(id: &str, role: UserRole) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            email: Email::parse(&format!("{id}@example.sa")).unwrap(),
            name: id.to_string(),
            role,
        }
    }

    fn new_store(slug: &str) -> NewStore {
        NewStore {
            name: LocalizedText::new("متجر", "Shop"),
            slug: slug.to_string(),
            description: LocalizedText::default(),
            logo_url: None,
            city: None,
            phone: None,
            shipping_fee: Money::ZERO,
        }
    }

    #[tokio::test]
    async fn test_create_starts_pending_and_promotes() {
        let state = state();
        let service = StoreService::new(&state);
        let (store, role) = service
            .create(&user("u1", UserRole::Customer), new_store("oud-house"))
            .await
            .unwrap();
        assert_eq!(store.status, StoreStatus::Pending);
        assert_eq!(role, UserRole::Seller);
    }

    #[tokio::test]
    async fn test_one_store_per_owner_and_unique_slug() {
        let state = state();
        let service = StoreService::new(&state);
        let owner = user("u1", UserRole::Seller);
        service.create(&owner, new_store("oud-house")).await.unwrap();

        let err = service.create(&owner, new_store("other")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(m) if m == messages::STORE_EXISTS));

        let err = service
            .create(&user("u2", UserRole::Seller), new_store("oud-house"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(m) if m == messages::SLUG_TAKEN));
    }

    #[tokio::test]
    async fn test_status_moves_and_cache_invalidation() {
        let state = state();
        let service = StoreService::new(&state);
        let (store, _) = service
            .create(&user("u1", UserRole::Seller), new_store("oud-house"))
            .await
            .unwrap();

        // Warm the cache with the pending store.
        assert!(service.visible(&store.id, None).await.is_err());

        // A pending store is approved before it can be suspended.
        let err = service
            .set_status(&store.id, StoreStatus::Suspended)
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);

        let active = service.set_status(&store.id, StoreStatus::Active).await.unwrap();
        assert!(active.is_active());
        assert!(service.visible(&store.id, None).await.is_ok());

        let err = service
            .set_status(&store.id, StoreStatus::Pending)
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_managed_by() {
        let state = state();
        let service = StoreService::new(&state);
        let seller = user("u1", UserRole::Seller);
        let (store, _) = service.create(&seller, new_store("oud-house")).await.unwrap();

        assert_eq!(service.managed_by(&seller, None).await.unwrap().id, store.id);
        assert!(matches!(
            service
                .managed_by(&seller, Some(&StoreId::new("other")))
                .await,
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            service
                .managed_by(&user("u2", UserRole::Seller), None)
                .await,
            Err(AppError::BadRequest(_))
        ));

        let admin = user("a1", UserRole::Admin);
        assert!(matches!(
            service.managed_by(&admin, None).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(
            service.managed_by(&admin, Some(&store.id)).await.unwrap().id,
            store.id
        );
    }
}
