//! Turning a cart into an order.
//!
//! Prices always come from the stored products. Stock, sales and coupon
//! usage are updated after the order is written, one document at a time; a
//! failure part-way is logged and the order stands.

use tracing::{info, instrument, warn};

use souq_core::forms::checkout::Checkout;
use souq_core::models::{CouponContext, OrderItem, OrderTotals, StatusChange};
use souq_core::{
    CurrencyCode, Money, Order, OrderId, OrderStatus, Product, ProductId, StoreId, Timestamp,
};

use crate::db::{CouponRepository, OrderRepository, ProductRepository};
use crate::error::{AppError, Entity, Result, add_breadcrumb, messages};
use crate::middleware::CurrentUser;
use crate::state::AppState;

use super::StoreService;

/// Checkout.
pub struct CheckoutService<'a> {
    state: &'a AppState,
    products: ProductRepository<'a>,
    coupons: CouponRepository<'a>,
    orders: OrderRepository<'a>,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub fn new(state: &'a AppState) -> Self {
        let documents = state.documents();
        Self {
            state,
            products: ProductRepository::new(documents),
            coupons: CouponRepository::new(documents),
            orders: OrderRepository::new(documents),
        }
    }

    /// Price the cart, apply the coupon and record the order as `pending`.
    ///
    /// # Errors
    ///
    /// - `AppError::NotFound` for an unknown store, product or coupon code
    /// - `AppError::BadRequest` when the store is not active, a product is
    ///   not for sale in it, or stock is short
    /// - `AppError::Coupon` when the coupon is rejected
    #[instrument(skip(self, buyer, checkout), fields(user_id = %buyer.id, store_id = %checkout.store_id))]
    pub async fn place_order(&self, buyer: &CurrentUser, checkout: Checkout) -> Result<Order> {
        let store = StoreService::new(self.state)
            .require(&checkout.store_id)
            .await?;
        if !store.is_active() {
            return Err(AppError::BadRequest(messages::STORE_NOT_ACTIVE));
        }

        let mut items = Vec::with_capacity(checkout.items.len());
        for (product_id, quantity) in &checkout.items {
            let product = self.purchasable(product_id, &store.id).await?;
            if !product.has_stock_for(*quantity) {
                return Err(AppError::BadRequest(messages::OUT_OF_STOCK));
            }
            items.push(OrderItem::new(
                product.id,
                product.name,
                product.price,
                *quantity,
            ));
        }

        let product_ids: Vec<ProductId> = items.iter().map(|i| i.product_id.clone()).collect();
        let subtotal: Money = items.iter().map(|i| i.line_total).sum();

        let coupon = match &checkout.coupon_code {
            Some(code) => {
                let coupon = self
                    .coupons
                    .get_by_code(&store.id, code)
                    .await?
                    .ok_or(AppError::NotFound(Entity::Coupon))?;
                let quote = coupon.evaluate(&CouponContext {
                    store_id: &store.id,
                    order_total: subtotal,
                    product_ids: &product_ids,
                    now: Timestamp::now(),
                })?;
                Some((coupon, quote.discount))
            }
            None => None,
        };
        let discount = coupon.as_ref().map_or(Money::ZERO, |(_, d)| *d);
        let totals = OrderTotals::compute(&items, discount, store.shipping_fee);

        let now = Timestamp::now();
        let order = Order {
            id: OrderId::generate(),
            user_id: buyer.id.clone(),
            store_id: store.id.clone(),
            items,
            product_ids,
            subtotal: totals.subtotal,
            discount: totals.discount,
            shipping_fee: totals.shipping_fee,
            total: totals.total,
            currency: self.currency(),
            coupon_code: coupon.as_ref().map(|(c, _)| c.code.clone()),
            shipping_address: checkout.shipping_address,
            status: OrderStatus::Pending,
            status_history: vec![StatusChange {
                status: OrderStatus::Pending,
                at: now,
                by: Some(buyer.id.clone()),
                note: None,
            }],
            created_at: now,
            updated_at: now,
        };
        let order = self.orders.create(&order).await?;

        for item in &order.items {
            match self
                .products
                .record_sale(&item.product_id, i64::from(item.quantity))
                .await
            {
                Ok(true) => {}
                Ok(false) => warn!(product_id = %item.product_id, "Product vanished before stock update"),
                Err(e) => warn!(product_id = %item.product_id, error = %e, "Stock update failed"),
            }
        }
        if let Some((coupon, _)) = &coupon
            && let Err(e) = self.coupons.record_use(&coupon.id).await
        {
            warn!(coupon_id = %coupon.id, error = %e, "Coupon usage update failed");
        }

        add_breadcrumb(
            "checkout",
            "Order placed",
            Some(&[("order_id", order.id.as_str()), ("store_id", order.store_id.as_str())]),
        );
        info!(order_id = %order.id, total = %order.total, "Order placed");
        Ok(order)
    }

    async fn purchasable(&self, id: &ProductId, store_id: &StoreId) -> Result<Product> {
        let product = self
            .products
            .get(id)
            .await?
            .ok_or(AppError::NotFound(Entity::Product))?;
        if &product.store_id != store_id || !product.is_active() {
            return Err(AppError::BadRequest(messages::PRODUCT_UNAVAILABLE));
        }
        Ok(product)
    }

    fn currency(&self) -> CurrencyCode {
        self.state.config().currency
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use souq_core::forms::checkout::{AddressForm, CartLine, CheckoutForm};
    use souq_core::{
        Coupon, CouponId, CouponStatus, DiscountType, Email, LocalizedText, ProductStatus, Store,
        StoreStatus, UserId, UserRole,
    };

    use super::*;
    use crate::config::ApiConfig;
    use crate::db::{MemoryDocumentStore, StoreRepository};

    fn money(s: &str) -> Money {
        Money::new(Decimal::from_str(s).unwrap())
    }

    fn buyer() -> CurrentUser {
        CurrentUser {
            id: UserId::new("buyer"),
            email: Email::parse("buyer@example.sa").unwrap(),
            name: "Buyer".to_string(),
            role: UserRole::Customer,
        }
    }

    async fn seeded(store_status: StoreStatus) -> AppState {
        let state = AppState::new(ApiConfig::for_memory(), Arc::new(MemoryDocumentStore::new()));
        let now = Timestamp::now();
        StoreRepository::new(state.documents())
            .create(&Store {
                id: StoreId::new("s1"),
                owner_id: UserId::new("seller"),
                name: LocalizedText::new("متجر", "Shop"),
                slug: "shop".to_string(),
                description: LocalizedText::default(),
                logo_url: None,
                city: None,
                phone: None,
                shipping_fee: money("15"),
                status: store_status,
                rating: Decimal::ZERO,
                review_count: 0,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let products = ProductRepository::new(state.documents());
        for (id, price, stock) in [("p1", "25.50", 5), ("p2", "10", 1)] {
            products
                .create(&Product {
                    id: ProductId::new(id),
                    store_id: StoreId::new("s1"),
                    name: LocalizedText::new("منتج", "Product"),
                    description: LocalizedText::default(),
                    category: "perfume".to_string(),
                    price: money(price),
                    compare_at_price: None,
                    stock,
                    images: vec![],
                    status: ProductStatus::Active,
                    views: 0,
                    sales: 0,
                    rating: Decimal::ZERO,
                    review_count: 0,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
        }

        CouponRepository::new(state.documents())
            .create(&Coupon {
                id: CouponId::new("c1"),
                store_id: StoreId::new("s1"),
                code: "EID".to_string(),
                discount_type: DiscountType::Fixed,
                value: Decimal::from(6),
                min_order_amount: None,
                max_discount: None,
                usage_limit: Some(1),
                used_count: 0,
                starts_at: None,
                expires_at: None,
                status: CouponStatus::Active,
                product_ids: vec![],
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        state
    }

    fn cart(lines: &[(&str, i64)], coupon: Option<&str>) -> Checkout {
        CheckoutForm {
            store_id: Some(StoreId::new("s1")),
            items: lines
                .iter()
                .map(|(id, quantity)| CartLine {
                    product_id: ProductId::new(*id),
                    quantity: *quantity,
                })
                .collect(),
            coupon_code: coupon.map(String::from),
            shipping_address: AddressForm {
                full_name: "Noura Saleh".to_string(),
                phone: "+966500000000".to_string(),
                city: "Riyadh".to_string(),
                street: "Olaya St".to_string(),
                notes: None,
            },
        }
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn test_prices_totals_and_side_effects() {
        let state = seeded(StoreStatus::Active).await;
        let service = CheckoutService::new(&state);

        let order = service
            .place_order(&buyer(), cart(&[("p1", 2), ("p2", 1)], Some("eid")))
            .await
            .unwrap();
        assert_eq!(order.subtotal, money("61"));
        assert_eq!(order.discount, money("6"));
        assert_eq!(order.total, money("70"));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.status_history.len(), 1);
        assert_eq!(order.coupon_code.as_deref(), Some("EID"));

        let products = ProductRepository::new(state.documents());
        let p1 = products.get(&ProductId::new("p1")).await.unwrap().unwrap();
        assert_eq!((p1.stock, p1.sales), (3, 2));

        let coupon = CouponRepository::new(state.documents())
            .get(&CouponId::new("c1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(coupon.used_count, 1);

        // The single-use coupon is now exhausted.
        let err = service
            .place_order(&buyer(), cart(&[("p1", 1)], Some("EID")))
            .await
            .unwrap_err();
        assert_eq!(err.payload().code(), "coupon_usage_limit");
    }

    #[tokio::test]
    async fn test_rejections() {
        let state = seeded(StoreStatus::Active).await;
        let service = CheckoutService::new(&state);

        let err = service
            .place_order(&buyer(), cart(&[("p2", 2)], None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(m) if m == messages::OUT_OF_STOCK));

        let err = service
            .place_order(&buyer(), cart(&[("ghost", 1)], None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(Entity::Product)));

        let err = service
            .place_order(&buyer(), cart(&[("p1", 1)], Some("NOPE")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(Entity::Coupon)));
    }

    #[tokio::test]
    async fn test_pending_store_rejected() {
        let state = seeded(StoreStatus::Pending).await;
        let err = CheckoutService::new(&state)
            .place_order(&buyer(), cart(&[("p1", 1)], None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(m) if m == messages::STORE_NOT_ACTIVE));
    }
}
