//! Catalog reads and writes with store ownership checks.

use tracing::{info, instrument, warn};

use souq_core::forms::product::{NewProduct, ProductPatch};
use souq_core::{Product, ProductId, ProductStatus, Timestamp};

use crate::db::products::ProductFilter;
use crate::db::{Cursor, Listing, ProductRepository};
use crate::error::{AppError, Entity, Result};
use crate::middleware::CurrentUser;
use crate::state::AppState;

use super::StoreService;
use super::stores::can_manage;

/// Product operations.
pub struct ProductService<'a> {
    state: &'a AppState,
    products: ProductRepository<'a>,
}

impl<'a> ProductService<'a> {
    #[must_use]
    pub fn new(state: &'a AppState) -> Self {
        Self {
            state,
            products: ProductRepository::new(state.documents()),
        }
    }

    /// One page of the catalog.
    ///
    /// Active products are public. Any other status is limited to admins,
    /// and to sellers for their own store.
    ///
    /// # Errors
    ///
    /// - `AppError::Unauthorized` when a hidden status is asked for anonymously
    /// - `AppError::Forbidden` when a customer asks for one
    pub async fn list(
        &self,
        viewer: Option<&CurrentUser>,
        mut filter: ProductFilter,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> Result<Listing<Product>> {
        if filter.status != ProductStatus::Active {
            let viewer = viewer.ok_or(AppError::Unauthorized)?;
            if !viewer.role.can_sell() {
                return Err(AppError::Forbidden);
            }
            if !viewer.is_admin() {
                let store = StoreService::new(self.state)
                    .managed_by(viewer, filter.store_id.as_ref())
                    .await?;
                filter.store_id = Some(store.id);
            }
        }
        Ok(self.products.list(filter, limit, cursor).await?)
    }

    async fn require(&self, id: &ProductId) -> Result<Product> {
        self.products
            .get(id)
            .await?
            .ok_or(AppError::NotFound(Entity::Product))
    }

    async fn managed(&self, actor: &CurrentUser, product: &Product) -> Result<bool> {
        if actor.is_admin() {
            return Ok(true);
        }
        let store = StoreService::new(self.state).get(&product.store_id).await?;
        Ok(store.is_some_and(|s| can_manage(actor, &s)))
    }

    /// Count a view, then read the product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` when the product is missing, or not
    /// active and `viewer` does not manage it.
    #[instrument(skip(self, viewer), fields(product_id = %id))]
    pub async fn view(&self, id: &ProductId, viewer: Option<&CurrentUser>) -> Result<Product> {
        if let Err(e) = self.products.record_view(id).await {
            warn!(error = %e, "Failed to count product view");
        }
        let product = self.require(id).await?;
        if product.is_active() {
            return Ok(product);
        }
        match viewer {
            Some(viewer) if self.managed(viewer, &product).await? => Ok(product),
            _ => Err(AppError::NotFound(Entity::Product)),
        }
    }

    /// List a product in the actor's store, or any store for admins.
    ///
    /// # Errors
    ///
    /// See [`StoreService::managed_by`].
    #[instrument(skip(self, actor, new), fields(user_id = %actor.id))]
    pub async fn create(&self, actor: &CurrentUser, new: NewProduct) -> Result<Product> {
        let store = StoreService::new(self.state)
            .managed_by(actor, new.store_id.as_ref())
            .await?;

        let now = Timestamp::now();
        let product = self
            .products
            .create(&Product {
                id: ProductId::generate(),
                store_id: store.id,
                name: new.name,
                description: new.description,
                category: new.category,
                price: new.price,
                compare_at_price: new.compare_at_price,
                stock: new.stock,
                images: new.images,
                status: new.status,
                views: 0,
                sales: 0,
                rating: rust_decimal::Decimal::ZERO,
                review_count: 0,
                created_at: now,
                updated_at: now,
            })
            .await?;
        info!(product_id = %product.id, store_id = %product.store_id, "Product created");
        Ok(product)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` unless the actor manages the store, and
    /// `AppError::Validation` when the merged prices are inconsistent.
    pub async fn update(
        &self,
        actor: &CurrentUser,
        id: &ProductId,
        patch: ProductPatch,
    ) -> Result<Product> {
        let current = self.require(id).await?;
        if !self.managed(actor, &current).await? {
            return Err(AppError::Forbidden);
        }
        let changes = patch.validate(&current)?;
        self.products
            .update(id, &changes)
            .await?
            .ok_or(AppError::NotFound(Entity::Product))
    }

    /// Remove a product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` or `AppError::Forbidden`.
    pub async fn delete(&self, actor: &CurrentUser, id: &ProductId) -> Result<()> {
        let current = self.require(id).await?;
        if !self.managed(actor, &current).await? {
            return Err(AppError::Forbidden);
        }
        if self.products.delete(id).await? {
            info!(product_id = %id, "Product deleted");
            Ok(())
        } else {
            Err(AppError::NotFound(Entity::Product))
        }
    }
}
