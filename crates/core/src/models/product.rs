//! Catalog products.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{LocalizedText, Money, ProductId, ProductStatus, StoreId, Timestamp};

/// A product listed by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub store_id: StoreId,
    pub name: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    pub category: String,
    pub price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_at_price: Option<Money>,
    pub stock: i64,
    #[serde(default)]
    pub images: Vec<String>,
    pub status: ProductStatus,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub sales: i64,
    /// Mean review rating, two decimal places; zero without reviews.
    #[serde(default, with = "rust_decimal::serde::float")]
    pub rating: Decimal,
    #[serde(default)]
    pub review_count: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Product {
    /// Whether the product is listed for sale.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Whether `quantity` units can be sold from current stock.
    #[must_use]
    pub fn has_stock_for(&self, quantity: u32) -> bool {
        self.stock >= i64::from(quantity)
    }
}
