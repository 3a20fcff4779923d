//! Order repository.
//!
//! Status changes write the new `status` and append to `statusHistory` with
//! a separate `push`, so the history is only ever extended.

use serde_json::Value;

use souq_core::models::StatusChange;
use souq_core::{Order, OrderId, OrderStatus, ProductId, StoreId, UserId};

use super::document::{Cursor, Direction, Document, Filter, FilterOp, Query, collections};
use super::{DocumentStore, Listing, Patch, RepositoryError, decode, decode_opt, touch};

/// Criteria for an order listing. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<UserId>,
    pub store_id: Option<StoreId>,
    pub status: Option<OrderStatus>,
}

/// Repository for orders.
pub struct OrderRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the lookup fails.
    /// Returns `RepositoryError::DataCorruption` if the document does not decode.
    pub async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let document = self.store.get(collections::ORDERS, id.as_str()).await?;
        decode_opt(collections::ORDERS, document)
    }

    /// One page of orders matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    pub async fn list(
        &self,
        filter: OrderFilter,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> Result<Listing<Order>, RepositoryError> {
        let mut query = Query::new()
            .order_by("createdAt", Direction::Desc)
            .limit(limit)
            .after(cursor);
        if let Some(user_id) = filter.user_id {
            query = query.eq("userId", user_id.into_inner());
        }
        if let Some(store_id) = filter.store_id {
            query = query.eq("storeId", store_id.into_inner());
        }
        if let Some(status) = filter.status {
            query = query.eq("status", status.as_str());
        }
        let page = self.store.query(collections::ORDERS, &query).await?;
        Listing::from_page(collections::ORDERS, page)
    }

    /// Insert a new order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id is taken.
    pub async fn create(&self, order: &Order) -> Result<Order, RepositoryError> {
        let document = Document::from_entity(order)?;
        let stored = self.store.insert(collections::ORDERS, document).await?;
        decode(collections::ORDERS, stored)
    }

    /// Record a status change and append it to the history.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if either write fails.
    pub async fn apply_status(
        &self,
        id: &OrderId,
        change: &StatusChange,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut patch = Patch::new();
        patch.insert(
            "status".to_string(),
            Value::String(change.status.as_str().to_string()),
        );
        if self
            .store
            .update(collections::ORDERS, id.as_str(), touch(patch))
            .await?
            .is_none()
        {
            return Ok(None);
        }

        let entry = serde_json::to_value(change)
            .map_err(|e| RepositoryError::corrupt(collections::ORDERS, &e))?;
        let document = self
            .store
            .push(collections::ORDERS, id.as_str(), "statusHistory", entry)
            .await?;
        decode_opt(collections::ORDERS, document)
    }

    /// Whether `user_id` has a delivered order containing `product_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the count fails.
    pub async fn has_delivered(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<bool, RepositoryError> {
        let filters = [
            eq_filter("userId", user_id.as_str()),
            eq_filter("status", OrderStatus::Delivered.as_str()),
            Filter {
                field: "productIds".to_string(),
                op: FilterOp::ArrayContains,
                value: Value::String(product_id.as_str().to_string()),
            },
        ];
        Ok(self.store.count(collections::ORDERS, &filters).await? > 0)
    }

    /// Number of orders with `status`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the count fails.
    pub async fn count_by_status(&self, status: OrderStatus) -> Result<u64, RepositoryError> {
        let filter = eq_filter("status", status.as_str());
        Ok(self.store.count(collections::ORDERS, &[filter]).await?)
    }

    /// Delete an order; `false` when it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the delete fails.
    pub async fn delete(&self, id: &OrderId) -> Result<bool, RepositoryError> {
        Ok(self.store.delete(collections::ORDERS, id.as_str()).await?)
    }
}

fn eq_filter(field: &str, value: &str) -> Filter {
    Filter {
        field: field.to_string(),
        op: FilterOp::Eq,
        value: Value::String(value.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use souq_core::models::{OrderItem, OrderTotals, ShippingAddress};
    use souq_core::{CurrencyCode, LocalizedText, Money, Timestamp};

    use super::*;
    use crate::db::MemoryDocumentStore;

    fn order(id: &str, user: &str, product: &str, status: OrderStatus) -> Order {
        let now = Timestamp::now();
        let items = vec![OrderItem::new(
            ProductId::new(product),
            LocalizedText::new("قهوة", "Coffee"),
            Money::from_minor(4500),
            2,
        )];
        let totals = OrderTotals::compute(&items, Money::ZERO, Money::ZERO);
        Order {
            id: OrderId::new(id),
            user_id: UserId::new(user),
            store_id: StoreId::new("s1"),
            product_ids: vec![ProductId::new(product)],
            items,
            subtotal: totals.subtotal,
            discount: totals.discount,
            shipping_fee: totals.shipping_fee,
            total: totals.total,
            currency: CurrencyCode::SAR,
            coupon_code: None,
            shipping_address: ShippingAddress {
                full_name: "Omar".to_string(),
                phone: "0500000000".to_string(),
                city: "Dammam".to_string(),
                street: "Corniche".to_string(),
                notes: None,
            },
            status,
            status_history: vec![StatusChange {
                status,
                at: now,
                by: None,
                note: None,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_apply_status_appends_history() {
        let docs = MemoryDocumentStore::new();
        let repo = OrderRepository::new(&docs);
        let placed = repo
            .create(&order("o1", "u1", "p1", OrderStatus::Pending))
            .await
            .unwrap();

        let change = placed
            .transition(OrderStatus::Confirmed, Some(UserId::new("seller")), None)
            .unwrap();
        let updated = repo.apply_status(&placed.id, &change).await.unwrap().unwrap();

        assert_eq!(updated.status, OrderStatus::Confirmed);
        assert_eq!(updated.status_history.len(), 2);
        assert_eq!(updated.status_history[0].status, OrderStatus::Pending);
        assert_eq!(updated.status_history[1], change);

        let missing = repo.apply_status(&OrderId::new("nope"), &change).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_has_delivered() {
        let docs = MemoryDocumentStore::new();
        let repo = OrderRepository::new(&docs);
        repo.create(&order("o1", "u1", "p1", OrderStatus::Delivered)).await.unwrap();
        repo.create(&order("o2", "u1", "p2", OrderStatus::Shipped)).await.unwrap();

        let u1 = UserId::new("u1");
        assert!(repo.has_delivered(&u1, &ProductId::new("p1")).await.unwrap());
        assert!(!repo.has_delivered(&u1, &ProductId::new("p2")).await.unwrap());
        assert!(!repo.has_delivered(&UserId::new("u2"), &ProductId::new("p1")).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_by_user_and_status() {
        let docs = MemoryDocumentStore::new();
        let repo = OrderRepository::new(&docs);
        repo.create(&order("o1", "u1", "p1", OrderStatus::Pending)).await.unwrap();
        repo.create(&order("o2", "u2", "p1", OrderStatus::Pending)).await.unwrap();
        repo.create(&order("o3", "u1", "p1", OrderStatus::Delivered)).await.unwrap();

        let filter = OrderFilter {
            user_id: Some(UserId::new("u1")),
            ..OrderFilter::default()
        };
        assert_eq!(repo.list(filter, 20, None).await.unwrap().items.len(), 2);
        assert_eq!(repo.count_by_status(OrderStatus::Pending).await.unwrap(), 2);
    }
}
