//! Seller stores.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{LocalizedText, Money, StoreId, StoreStatus, Timestamp, UserId};

/// A seller's storefront inside the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: StoreId,
    pub owner_id: UserId,
    pub name: LocalizedText,
    pub slug: String,
    #[serde(default)]
    pub description: LocalizedText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Flat shipping fee added to every order from this store.
    #[serde(default)]
    pub shipping_fee: Money,
    pub status: StoreStatus,
    /// Mean rating across all reviews of the store's products.
    #[serde(default, with = "rust_decimal::serde::float")]
    pub rating: Decimal,
    #[serde(default)]
    pub review_count: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Store {
    /// Whether shoppers can browse and buy from this store.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == StoreStatus::Active
    }

    /// Whether `user_id` owns this store.
    #[must_use]
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.owner_id == user_id
    }
}
