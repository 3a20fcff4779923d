//! Order visibility and status changes.
//!
//! | actor | may see | may move |
//! |---|---|---|
//! | buyer | own orders | `pending` -> `cancelled` only |
//! | store owner | the store's orders | any allowed transition |
//! | admin | everything | any allowed transition |

use tracing::{info, instrument, warn};

use souq_core::{Order, OrderId, OrderStatus, StoreId};

use crate::db::orders::OrderFilter;
use crate::db::{Cursor, Listing, OrderRepository, ProductRepository, StoreRepository};
use crate::error::{AppError, Entity, Result, add_breadcrumb};
use crate::middleware::CurrentUser;
use crate::state::AppState;

use super::StoreService;

/// Whose orders a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderScope {
    /// Sellers see their store's orders, admins see all, customers their own.
    #[default]
    Role,
    /// Orders the caller placed, whatever the role.
    Purchases,
}

/// Order operations.
pub struct OrderService<'a> {
    state: &'a AppState,
    orders: OrderRepository<'a>,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub fn new(state: &'a AppState) -> Self {
        Self {
            state,
            orders: OrderRepository::new(state.documents()),
        }
    }

    /// Orders visible to `actor`, newest first.
    ///
    /// Admins may narrow by store and buyer; the other roles are pinned to
    /// their own scope and those parameters are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list(
        &self,
        actor: &CurrentUser,
        scope: OrderScope,
        mut filter: OrderFilter,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> Result<Listing<Order>> {
        match scope {
            OrderScope::Purchases => {
                filter.user_id = Some(actor.id.clone());
                filter.store_id = None;
            }
            OrderScope::Role if actor.is_admin() => {}
            OrderScope::Role => {
                let owned = if actor.role.can_sell() {
                    StoreRepository::new(self.state.documents())
                        .get_by_owner(&actor.id)
                        .await?
                } else {
                    None
                };
                match owned {
                    Some(store) => {
                        filter.store_id = Some(store.id);
                        filter.user_id = None;
                    }
                    None => {
                        filter.user_id = Some(actor.id.clone());
                        filter.store_id = None;
                    }
                }
            }
        }
        Ok(self.orders.list(filter, limit, cursor).await?)
    }

    /// Load an order the actor may see.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` when missing and `AppError::Forbidden`
    /// when the actor is neither buyer, store owner nor admin.
    pub async fn get(&self, actor: &CurrentUser, id: &OrderId) -> Result<Order> {
        let order = self.require(id).await?;
        if order.is_placed_by(&actor.id) || self.manages(actor, &order.store_id).await? {
            Ok(order)
        } else {
            Err(AppError::Forbidden)
        }
    }

    async fn require(&self, id: &OrderId) -> Result<Order> {
        self.orders
            .get(id)
            .await?
            .ok_or(AppError::NotFound(Entity::Order))
    }

    async fn manages(&self, actor: &CurrentUser, store_id: &StoreId) -> Result<bool> {
        if actor.is_admin() {
            return Ok(true);
        }
        let store = StoreService::new(self.state).get(store_id).await?;
        Ok(store.is_some_and(|s| s.is_owned_by(&actor.id)))
    }

    /// Move an order to `status`, appending to its history.
    ///
    /// Cancelling puts the items back in stock.
    ///
    /// # Errors
    ///
    /// - `AppError::Forbidden` when the actor may not make this change
    /// - `AppError::Transition` when the status table forbids it
    #[instrument(skip(self, actor, note), fields(order_id = %id, to = %status))]
    pub async fn update_status(
        &self,
        actor: &CurrentUser,
        id: &OrderId,
        status: OrderStatus,
        note: Option<String>,
    ) -> Result<Order> {
        let order = self.require(id).await?;

        if !self.manages(actor, &order.store_id).await? {
            let buyer_cancel = order.is_placed_by(&actor.id)
                && status == OrderStatus::Cancelled
                && order.is_cancellable_by_buyer();
            if !buyer_cancel {
                return Err(AppError::Forbidden);
            }
        }

        let change = order.transition(status, Some(actor.id.clone()), note)?;
        let updated = self
            .orders
            .apply_status(id, &change)
            .await?
            .ok_or(AppError::NotFound(Entity::Order))?;

        if status == OrderStatus::Cancelled {
            self.restock(&updated).await;
        }

        add_breadcrumb(
            "orders",
            "Order status changed",
            Some(&[("order_id", id.as_str()), ("status", status.as_str())]),
        );
        info!(from = %order.status, "Order status changed");
        Ok(updated)
    }

    async fn restock(&self, order: &Order) {
        let products = ProductRepository::new(self.state.documents());
        for item in &order.items {
            if let Err(e) = products
                .record_sale(&item.product_id, -i64::from(item.quantity))
                .await
            {
                warn!(product_id = %item.product_id, error = %e, "Restock failed");
            }
        }
    }

    /// Delete an order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` when the order does not exist.
    pub async fn delete(&self, id: &OrderId) -> Result<()> {
        if self.orders.delete(id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(Entity::Order))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use souq_core::models::{OrderItem, OrderTotals, ShippingAddress, StatusChange};
    use souq_core::{
        CurrencyCode, Email, LocalizedText, Money, Product, ProductId, ProductStatus, Store,
        StoreStatus, Timestamp, UserId, UserRole,
    };

    use super::*;
    use crate::config::ApiConfig;
    use crate::db::MemoryDocumentStore;

    fn actor(id: &str, role: UserRole) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            email: Email::parse(&format!("{id}@example.sa")).unwrap(),
            name: id.to_string(),
            role,
        }
    }

    async fn seeded() -> AppState {
        let state = AppState::new(ApiConfig::for_memory(), Arc::new(MemoryDocumentStore::new()));
        let docs = state.documents();
        let now = Timestamp::now();

        StoreRepository::new(docs)
            .create(&Store {
                id: StoreId::new("s1"),
                owner_id: UserId::new("seller"),
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
            })
            .await
            .unwrap();

        ProductRepository::new(docs)
            .create(&Product {
                id: ProductId::new("p1"),
                store_id: StoreId::new("s1"),
                name: LocalizedText::new("عود", "Oud"),
                description: LocalizedText::default(),
                category: "perfume".to_string(),
                price: Money::new(Decimal::from(100)),
                compare_at_price: None,
                stock: 8,
                images: vec![],
                status: ProductStatus::Active,
                views: 0,
                sales: 2,
                rating: Decimal::ZERO,
                review_count: 0,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let items = vec![OrderItem::new(
            ProductId::new("p1"),
            LocalizedText::new("عود", "Oud"),
            Money::new(Decimal::from(100)),
            2,
        )];
        let totals = OrderTotals::compute(&items, Money::ZERO, Money::ZERO);
        OrderRepository::new(docs)
            .create(&Order {
                id: OrderId::new("o1"),
                user_id: UserId::new("buyer"),
                store_id: StoreId::new("s1"),
                product_ids: vec![ProductId::new("p1")],
                items,
                subtotal: totals.subtotal,
                discount: totals.discount,
                shipping_fee: totals.shipping_fee,
                total: totals.total,
                currency: CurrencyCode::SAR,
                coupon_code: None,
                shipping_address: ShippingAddress {
                    full_name: "Noura".to_string(),
                    phone: "+966500000000".to_string(),
                    city: "Riyadh".to_string(),
                    street: "Olaya".to_string(),
                    notes: None,
                },
                status: OrderStatus::Pending,
                status_history: vec![StatusChange {
                    status: OrderStatus::Pending,
                    at: now,
                    by: None,
                    note: None,
                }],
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        state
    }

    #[tokio::test]
    async fn test_visibility() {
        let state = seeded().await;
        let service = OrderService::new(&state);
        let id = OrderId::new("o1");

        assert!(service.get(&actor("buyer", UserRole::Customer), &id).await.is_ok());
        assert!(service.get(&actor("seller", UserRole::Seller), &id).await.is_ok());
        assert!(service.get(&actor("root", UserRole::Admin), &id).await.is_ok());
        assert!(matches!(
            service.get(&actor("other", UserRole::Customer), &id).await,
            Err(AppError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_list_scopes() {
        let state = seeded().await;
        let service = OrderService::new(&state);
        let filter = OrderFilter::default;

        let seller = service
            .list(&actor("seller", UserRole::Seller), OrderScope::Role, filter(), 20, None)
            .await
            .unwrap();
        assert_eq!(seller.items.len(), 1);

        let purchases = service
            .list(&actor("seller", UserRole::Seller), OrderScope::Purchases, filter(), 20, None)
            .await
            .unwrap();
        assert!(purchases.items.is_empty());

        let stranger = service
            .list(&actor("other", UserRole::Customer), OrderScope::Role, filter(), 20, None)
            .await
            .unwrap();
        assert!(stranger.items.is_empty());
    }

    #[tokio::test]
    async fn test_seller_moves_forward_and_history_grows() {
        let state = seeded().await;
        let service = OrderService::new(&state);
        let seller = actor("seller", UserRole::Seller);
        let id = OrderId::new("o1");

        let order = service
            .update_status(&seller, &id, OrderStatus::Confirmed, Some("packed".to_string()))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.status_history.len(), 2);
        assert_eq!(order.status_history[1].note.as_deref(), Some("packed"));

        let err = service
            .update_status(&seller, &id, OrderStatus::Delivered, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Transition(_)));

        let err = service
            .update_status(&seller, &id, OrderStatus::Confirmed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Transition(_)));
    }

    #[tokio::test]
    async fn test_buyer_cancel_restocks() {
        let state = seeded().await;
        let service = OrderService::new(&state);
        let buyer = actor("buyer", UserRole::Customer);
        let id = OrderId::new("o1");

        assert!(matches!(
            service
                .update_status(&buyer, &id, OrderStatus::Confirmed, None)
                .await,
            Err(AppError::Forbidden)
        ));

        let order = service
            .update_status(&buyer, &id, OrderStatus::Cancelled, None)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);

        let product = ProductRepository::new(state.documents())
            .get(&ProductId::new("p1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!((product.stock, product.sales), (10, 0));
    }

    #[tokio::test]
    async fn test_buyer_cannot_cancel_after_confirmation() {
        let state = seeded().await;
        let service = OrderService::new(&state);
        let id = OrderId::new("o1");
        service
            .update_status(&actor("seller", UserRole::Seller), &id, OrderStatus::Confirmed, None)
            .await
            .unwrap();

        assert!(matches!(
            service
                .update_status(&actor("buyer", UserRole::Customer), &id, OrderStatus::Cancelled, None)
                .await,
            Err(AppError::Forbidden)
        ));
    }
}
