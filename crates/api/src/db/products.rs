//! Product repository.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;

use souq_core::forms::product::ProductChanges;
use souq_core::models::RatingSummary;
use souq_core::{Money, Product, ProductId, ProductStatus, StoreId};

use super::document::{Cursor, Direction, Document, Filter, FilterOp, Query, collections, patch_from};
use super::stores::rating_patch;
use super::{DocumentStore, Listing, Patch, RepositoryError, decode, decode_opt, touch};

/// Sortable product fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    CreatedAt,
    Price,
    Rating,
    Sales,
}

impl ProductSort {
    const fn field(self) -> &'static str {
        match self {
            Self::CreatedAt => "createdAt",
            Self::Price => "price",
            Self::Rating => "rating",
            Self::Sales => "sales",
        }
    }
}

impl FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" => Ok(Self::CreatedAt),
            "price" => Ok(Self::Price),
            "rating" => Ok(Self::Rating),
            "sales" => Ok(Self::Sales),
            other => Err(format!("invalid sort field: {other}")),
        }
    }
}

/// Criteria for a catalog listing.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub store_id: Option<StoreId>,
    pub category: Option<String>,
    pub status: ProductStatus,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub sort: ProductSort,
    pub direction: Direction,
}

impl ProductFilter {
    fn into_query(self) -> Query {
        let mut query = Query::new()
            .eq("status", self.status.as_str())
            .order_by(self.sort.field(), self.direction);
        if let Some(store_id) = self.store_id {
            query = query.eq("storeId", store_id.into_inner());
        }
        if let Some(category) = self.category {
            query = query.eq("category", category);
        }
        if let Some(min) = self.min_price {
            query = query.filter("price", FilterOp::Gte, money_value(min));
        }
        if let Some(max) = self.max_price {
            query = query.filter("price", FilterOp::Lte, money_value(max));
        }
        query
    }
}

fn money_value(money: Money) -> Value {
    money.amount().to_f64().map_or(Value::Null, Value::from)
}

/// Repository for catalog products.
pub struct ProductRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the lookup fails.
    /// Returns `RepositoryError::DataCorruption` if the document does not decode.
    pub async fn get(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let document = self.store.get(collections::PRODUCTS, id.as_str()).await?;
        decode_opt(collections::PRODUCTS, document)
    }

    /// One page of products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails, including an
    /// invalid cursor.
    pub async fn list(
        &self,
        filter: ProductFilter,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> Result<Listing<Product>, RepositoryError> {
        let query = filter.into_query().limit(limit).after(cursor);
        let page = self.store.query(collections::PRODUCTS, &query).await?;
        Listing::from_page(collections::PRODUCTS, page)
    }

    /// Insert a new product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id is taken.
    pub async fn create(&self, product: &Product) -> Result<Product, RepositoryError> {
        let document = Document::from_entity(product)?;
        let stored = self.store.insert(collections::PRODUCTS, document).await?;
        decode(collections::PRODUCTS, stored)
    }

    /// Apply listing changes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the update fails.
    pub async fn update(
        &self,
        id: &ProductId,
        changes: &ProductChanges,
    ) -> Result<Option<Product>, RepositoryError> {
        self.patch(id, patch_from(changes)?).await
    }

    /// Store the rating aggregate.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the update fails.
    pub async fn set_rating(
        &self,
        id: &ProductId,
        summary: RatingSummary,
    ) -> Result<Option<Product>, RepositoryError> {
        self.patch(id, rating_patch(summary)).await
    }

    async fn patch(
        &self,
        id: &ProductId,
        patch: Patch,
    ) -> Result<Option<Product>, RepositoryError> {
        let document = self
            .store
            .update(collections::PRODUCTS, id.as_str(), touch(patch))
            .await?;
        decode_opt(collections::PRODUCTS, document)
    }

    /// Count a product view.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the update fails.
    pub async fn record_view(&self, id: &ProductId) -> Result<bool, RepositoryError> {
        self.increment(id, "views", 1).await
    }

    /// Move `quantity` units from stock to sales (negative to reverse).
    ///
    /// The two counters are updated by separate writes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if either update fails.
    pub async fn record_sale(&self, id: &ProductId, quantity: i64) -> Result<bool, RepositoryError> {
        let found = self.increment(id, "stock", -quantity).await?;
        if found {
            self.increment(id, "sales", quantity).await?;
        }
        Ok(found)
    }

    async fn increment(
        &self,
        id: &ProductId,
        field: &str,
        delta: i64,
    ) -> Result<bool, RepositoryError> {
        let document = self
            .store
            .increment(collections::PRODUCTS, id.as_str(), field, delta)
            .await?;
        Ok(document.is_some())
    }

    /// Delete a product; `false` when it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the delete fails.
    pub async fn delete(&self, id: &ProductId) -> Result<bool, RepositoryError> {
        Ok(self.store.delete(collections::PRODUCTS, id.as_str()).await?)
    }

    /// Number of products with `status`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the count fails.
    pub async fn count_by_status(&self, status: ProductStatus) -> Result<u64, RepositoryError> {
        let filter = Filter {
            field: "status".to_string(),
            op: FilterOp::Eq,
            value: Value::String(status.as_str().to_string()),
        };
        Ok(self.store.count(collections::PRODUCTS, &[filter]).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use souq_core::{LocalizedText, Timestamp};

    use super::*;
    use crate::db::MemoryDocumentStore;

    fn product(id: &str, store: &str, price: i64, status: ProductStatus) -> Product {
        let now = Timestamp::now();
        Product {
            id: ProductId::new(id),
            store_id: StoreId::new(store),
            name: LocalizedText::new("تمر", "Dates"),
            description: LocalizedText::default(),
            category: "food".to_string(),
            price: Money::new(Decimal::from(price)),
            compare_at_price: None,
            stock: 10,
            images: vec![],
            status,
            views: 0,
            sales: 0,
            rating: Decimal::ZERO,
            review_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    async fn seeded(docs: &MemoryDocumentStore) {
        let repo = ProductRepository::new(docs);
        for (id, store, price, status) in [
            ("p1", "s1", 40, ProductStatus::Active),
            ("p2", "s1", 15, ProductStatus::Active),
            ("p3", "s2", 25, ProductStatus::Active),
            ("p4", "s1", 30, ProductStatus::Draft),
        ] {
            repo.create(&product(id, store, price, status)).await.unwrap();
        }
    }

    fn ids(listing: &Listing<Product>) -> Vec<&str> {
        listing.items.iter().map(|p| p.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_list_by_price_range() {
        let docs = MemoryDocumentStore::new();
        seeded(&docs).await;
        let repo = ProductRepository::new(&docs);

        let filter = ProductFilter {
            min_price: Some(Money::new(Decimal::from(20))),
            sort: ProductSort::Price,
            ..ProductFilter::default()
        };
        let listing = repo.list(filter, 20, None).await.unwrap();
        assert_eq!(ids(&listing), vec!["p3", "p1"]);
    }

    #[tokio::test]
    async fn test_list_by_store_excludes_drafts() {
        let docs = MemoryDocumentStore::new();
        seeded(&docs).await;
        let repo = ProductRepository::new(&docs);

        let filter = ProductFilter {
            store_id: Some(StoreId::new("s1")),
            sort: ProductSort::Price,
            direction: Direction::Desc,
            ..ProductFilter::default()
        };
        let listing = repo.list(filter, 20, None).await.unwrap();
        assert_eq!(ids(&listing), vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn test_record_sale_and_view() {
        let docs = MemoryDocumentStore::new();
        seeded(&docs).await;
        let repo = ProductRepository::new(&docs);
        let id = ProductId::new("p1");

        assert!(repo.record_sale(&id, 3).await.unwrap());
        assert!(repo.record_view(&id).await.unwrap());
        let p = repo.get(&id).await.unwrap().unwrap();
        assert_eq!((p.stock, p.sales, p.views), (7, 3, 1));

        repo.record_sale(&id, -3).await.unwrap();
        let p = repo.get(&id).await.unwrap().unwrap();
        assert_eq!((p.stock, p.sales), (10, 0));

        assert!(!repo.record_view(&ProductId::new("nope")).await.unwrap());
    }

    #[test]
    fn test_sort_parse() {
        assert_eq!("price".parse::<ProductSort>().unwrap(), ProductSort::Price);
        assert!("views".parse::<ProductSort>().is_err());
    }
}
