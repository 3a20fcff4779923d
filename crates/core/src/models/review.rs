//! Product reviews and rating aggregation.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::types::{ProductId, ReviewId, StoreId, Timestamp, UserId};

/// A star rating between 1 and 5 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

/// A rating outside `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rating must be between {min} and {max}, got {got}", min = Rating::MIN, max = Rating::MAX)]
pub struct RatingError {
    pub got: i64,
}

impl Rating {
    /// Lowest allowed rating.
    pub const MIN: u8 = 1;
    /// Highest allowed rating.
    pub const MAX: u8 = 5;

    /// Validate a rating.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError`] unless `1 <= value <= 5`.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError { got: value })
    }

    /// The rating as a number.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i64::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

/// A shopper's review of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub user_id: UserId,
    pub user_name: String,
    pub rating: Rating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// The reviewer has a delivered order containing the product.
    #[serde(default)]
    pub verified_purchase: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Mean rating and count over a set of reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub rating: Decimal,
    pub review_count: u64,
}

impl RatingSummary {
    /// Aggregate ratings: mean rounded to two places, zero when empty.
    #[must_use]
    pub fn from_ratings(ratings: impl IntoIterator<Item = Rating>) -> Self {
        let (sum, count) = ratings
            .into_iter()
            .fold((0_u64, 0_u64), |(sum, count), r| {
                (sum + u64::from(r.value()), count + 1)
            });

        if count == 0 {
            return Self::default();
        }

        let mean = Decimal::from(sum) / Decimal::from(count);
        Self {
            rating: mean.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            review_count: count,
        }
    }
}
