//! Coupon management and redemption checks.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use souq_core::forms::coupon::{CouponChanges, CouponCheck, NewCoupon};
use souq_core::forms::{ValidationErrors, Violation};
use souq_core::models::CouponContext;
use souq_core::{Coupon, CouponId, DiscountType, Money, ProductId, Store, StoreId, Timestamp};

use crate::db::{CouponRepository, ProductRepository};
use crate::error::{AppError, Entity, Result, messages};
use crate::state::AppState;

/// `data` of a successful `POST /api/coupons/validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponValidation {
    pub coupon_id: CouponId,
    pub code: String,
    #[serde(rename = "type")]
    pub discount_type: DiscountType,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    pub discount: Money,
    pub final_total: Money,
}

/// Coupon operations.
pub struct CouponService<'a> {
    coupons: CouponRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> CouponService<'a> {
    #[must_use]
    pub fn new(state: &'a AppState) -> Self {
        Self {
            coupons: CouponRepository::new(state.documents()),
            products: ProductRepository::new(state.documents()),
        }
    }

    /// Load a coupon or fail with 404.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` when the coupon does not exist.
    pub async fn require(&self, id: &CouponId) -> Result<Coupon> {
        self.coupons
            .get(id)
            .await?
            .ok_or(AppError::NotFound(Entity::Coupon))
    }

    /// Issue a coupon for `store`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` when a scoped product is not in the
    /// store and `AppError::Conflict` when the code already exists there.
    #[instrument(skip(self, store, new), fields(store_id = %store.id, code = %new.code))]
    pub async fn create(&self, store: &Store, new: NewCoupon) -> Result<Coupon> {
        self.check_scope(&store.id, &new.product_ids).await?;
        if self.coupons.get_by_code(&store.id, &new.code).await?.is_some() {
            return Err(AppError::Conflict(messages::COUPON_CODE_TAKEN));
        }

        let now = Timestamp::now();
        let coupon = Coupon {
            id: CouponId::generate(),
            store_id: store.id.clone(),
            code: new.code,
            discount_type: new.discount_type,
            value: new.value,
            min_order_amount: new.min_order_amount,
            max_discount: new.max_discount,
            usage_limit: new.usage_limit,
            used_count: 0,
            starts_at: new.starts_at,
            expires_at: new.expires_at,
            status: new.status,
            product_ids: new.product_ids,
            created_at: now,
            updated_at: now,
        };
        Ok(self.coupons.create(&coupon).await?)
    }

    /// Apply validated changes to `current`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` when a scoped product is not in the
    /// store and `AppError::Conflict` when a new code is already used there.
    #[instrument(skip(self, current, changes), fields(coupon_id = %current.id))]
    pub async fn update(&self, current: &Coupon, changes: &CouponChanges) -> Result<Coupon> {
        if let Some(product_ids) = &changes.product_ids {
            self.check_scope(&current.store_id, product_ids).await?;
        }
        if let Some(code) = &changes.code
            && *code != current.code
            && self
                .coupons
                .get_by_code(&current.store_id, code)
                .await?
                .is_some()
        {
            return Err(AppError::Conflict(messages::COUPON_CODE_TAKEN));
        }

        self.coupons
            .update(&current.id, changes)
            .await?
            .ok_or(AppError::NotFound(Entity::Coupon))
    }

    /// Every scoped product must exist and belong to `store_id`.
    async fn check_scope(&self, store_id: &StoreId, product_ids: &[ProductId]) -> Result<()> {
        let mut errors = ValidationErrors::new();
        for (index, id) in product_ids.iter().enumerate() {
            let in_store = self
                .products
                .get(id)
                .await?
                .is_some_and(|product| &product.store_id == store_id);
            if !in_store {
                errors.add(format!("productIds[{index}]"), Violation::NotInStore);
            }
        }
        errors.finish(()).map_err(AppError::from)
    }

    /// Delete a coupon.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` when the coupon does not exist.
    pub async fn delete(&self, id: &CouponId) -> Result<()> {
        if self.coupons.delete(id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(Entity::Coupon))
        }
    }

    /// Look up a code in a store and check it against a cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown code and `AppError::Coupon`
    /// with the first failed rule otherwise.
    #[instrument(skip(self, check), fields(store_id = %check.store_id, code = %check.code))]
    pub async fn validate(&self, check: &CouponCheck) -> Result<CouponValidation> {
        let coupon = self
            .coupons
            .get_by_code(&check.store_id, &check.code)
            .await?
            .ok_or(AppError::NotFound(Entity::Coupon))?;

        let quote = coupon.evaluate(&CouponContext {
            store_id: &check.store_id,
            order_total: check.order_total,
            product_ids: &check.product_ids,
            now: Timestamp::now(),
        })?;

        Ok(CouponValidation {
            coupon_id: coupon.id,
            code: coupon.code,
            discount_type: coupon.discount_type,
            value: coupon.value,
            discount: quote.discount,
            final_total: quote.final_total,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use souq_core::forms::coupon::CouponForm;
    use souq_core::forms::coupon::CouponPatch;
    use souq_core::{CouponStatus, LocalizedText, Product, ProductStatus, StoreStatus, UserId};
    use souq_core::models::CouponRejection;

    use super::*;
    use crate::config::ApiConfig;
    use crate::db::MemoryDocumentStore;

    fn state() -> AppState {
        AppState::new(ApiConfig::for_memory(), Arc::new(MemoryDocumentStore::new()))
    }

    fn store() -> Store {
        let now = Timestamp::now();
        Store {
            id: StoreId::new("s1"),
            owner_id: UserId::new("u1"),
            name: LocalizedText::new("متجر", "Shop"),
            slug: "shop".to_string(),
            description: LocalizedText::default(),
            logo_url: None,
            city: None,
            phone: None,
            shipping_fee: Money::ZERO,
            status: StoreStatus::Active,
            rating: Decimal::ZERO,
            review_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn form(code: &str, value: i64) -> NewCoupon {
        CouponForm {
            code: Some(code.to_string()),
            discount_type: Some(DiscountType::Percentage),
            value: Some(Decimal::from(value)),
            ..CouponForm::default()
        }
        .validate()
        .unwrap()
    }

    fn check(code: &str, total: i64) -> CouponCheck {
        CouponCheck {
            code: code.to_string(),
            store_id: StoreId::new("s1"),
            order_total: Money::new(Decimal::from(total)),
            product_ids: vec![ProductId::new("p1")],
        }
    }

    #[tokio::test]
    async fn test_duplicate_code_in_store() {
        let state = state();
        let service = CouponService::new(&state);
        service.create(&store(), form("eid", 10)).await.unwrap();
        let err = service.create(&store(), form("EID", 20)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(m) if m == messages::COUPON_CODE_TAKEN));
    }

    #[tokio::test]
    async fn test_validate_computes_discount() {
        let state = state();
        let service = CouponService::new(&state);
        service.create(&store(), form("EID", 15)).await.unwrap();

        let result = service.validate(&check("EID", 200)).await.unwrap();
        assert_eq!(result.discount, Money::new(Decimal::from(30)));
        assert_eq!(result.final_total, Money::new(Decimal::from(170)));
        assert_eq!(result.discount_type, DiscountType::Percentage);
    }

    #[tokio::test]
    async fn test_validate_unknown_and_inactive() {
        let state = state();
        let service = CouponService::new(&state);
        assert!(matches!(
            service.validate(&check("NOPE", 100)).await,
            Err(AppError::NotFound(Entity::Coupon))
        ));

        let mut new = form("OFF", 10);
        new.status = CouponStatus::Inactive;
        service.create(&store(), new).await.unwrap();
        assert!(matches!(
            service.validate(&check("OFF", 100)).await,
            Err(AppError::Coupon(CouponRejection::Inactive))
        ));
    }

    fn product(id: &str, store_id: &str) -> Product {
        let now = Timestamp::now();
        Product {
            id: ProductId::new(id),
            store_id: StoreId::new(store_id),
            name: LocalizedText::new("عود", "Oud"),
            description: LocalizedText::default(),
            category: "perfume".to_string(),
            price: Money::new(Decimal::from(100)),
            compare_at_price: None,
            stock: 5,
            images: vec![],
            status: ProductStatus::Active,
            views: 0,
            sales: 0,
            rating: Decimal::ZERO,
            review_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_product_scope_must_be_in_store() {
        let state = state();
        let products = ProductRepository::new(state.documents());
        products.create(&product("p1", "s1")).await.unwrap();
        products.create(&product("p2", "s2")).await.unwrap();
        let service = CouponService::new(&state);

        let mut new = form("OUD", 10);
        new.product_ids = vec![ProductId::new("p1"), ProductId::new("p2"), ProductId::new("gone")];
        let Err(AppError::Validation(errors)) = service.create(&store(), new).await else {
            panic!("expected a validation error");
        };
        assert!(!errors.has("productIds[0]"));
        assert!(errors.has("productIds[1]"));
        assert!(errors.has("productIds[2]"));

        let mut new = form("OUD", 10);
        new.product_ids = vec![ProductId::new("p1")];
        let coupon = service.create(&store(), new).await.unwrap();

        let changes = CouponPatch {
            product_ids: Some(vec![ProductId::new("p2")]),
            ..CouponPatch::default()
        }
        .validate(&coupon)
        .unwrap();
        assert!(matches!(
            service.update(&coupon, &changes).await,
            Err(AppError::Validation(_))
        ));
    }
}
