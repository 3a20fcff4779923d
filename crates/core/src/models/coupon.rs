//! Store coupons and their redemption rules.
//!
//! # Evaluation order
//!
//! [`Coupon::evaluate`] checks, in order, and reports the first failure:
//!
//! 1. status is `active` (regardless of dates)
//! 2. `startsAt` has passed
//! 3. `expiresAt` has not passed
//! 4. usage cap not reached
//! 5. coupon belongs to the cart's store
//! 6. order total meets `minOrderAmount`
//! 7. at least one cart product is in scope when the coupon is product-scoped
//!
//! The discount is then computed on the order total and clamped to it.

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{
    CouponId, CouponStatus, DiscountType, Locale, Money, ProductId, StoreId, Timestamp,
};

/// Characters used for generated codes (no `0/O/1/I` look-alikes).
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of generated coupon codes.
pub const GENERATED_CODE_LENGTH: usize = 8;

/// A discount code issued by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: CouponId,
    pub store_id: StoreId,
    /// Trimmed, uppercase code; unique within the store.
    pub code: String,
    #[serde(rename = "type")]
    pub discount_type: DiscountType,
    /// Percent (0-100] for `percentage`, currency units for `fixed`.
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_order_amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_discount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<u64>,
    #[serde(default)]
    pub used_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    pub status: CouponStatus,
    /// Products the coupon applies to; empty means the whole store.
    #[serde(default)]
    pub product_ids: Vec<ProductId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// The cart a coupon is being applied to.
#[derive(Debug, Clone)]
pub struct CouponContext<'a> {
    pub store_id: &'a StoreId,
    pub order_total: Money,
    pub product_ids: &'a [ProductId],
    pub now: Timestamp,
}

/// Why a coupon cannot be redeemed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponRejection {
    #[error("coupon is not active")]
    Inactive,
    #[error("coupon is not valid yet")]
    NotYetActive,
    #[error("coupon has expired")]
    Expired,
    #[error("coupon usage limit reached")]
    UsageLimitReached,
    #[error("coupon belongs to a different store")]
    WrongStore,
    #[error("order total is below the coupon minimum of {min}")]
    BelowMinimum { min: Money },
    #[error("coupon does not apply to any product in the order")]
    NotApplicable,
}

impl CouponRejection {
    /// Stable machine-readable code for API clients.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Inactive => "coupon_inactive",
            Self::NotYetActive => "coupon_not_started",
            Self::Expired => "coupon_expired",
            Self::UsageLimitReached => "coupon_usage_limit",
            Self::WrongStore => "coupon_wrong_store",
            Self::BelowMinimum { .. } => "coupon_below_minimum",
            Self::NotApplicable => "coupon_not_applicable",
        }
    }

    /// Human-readable reason in `locale`.
    #[must_use]
    pub fn message(&self, locale: Locale) -> String {
        match locale {
            Locale::En => self.to_string(),
            Locale::Ar => match self {
                Self::Inactive => "الكوبون غير مفعل".to_owned(),
                Self::NotYetActive => "الكوبون غير صالح بعد".to_owned(),
                Self::Expired => "انتهت صلاحية الكوبون".to_owned(),
                Self::UsageLimitReached => "تم استنفاد الحد الأقصى لاستخدام الكوبون".to_owned(),
                Self::WrongStore => "الكوبون لا يخص هذا المتجر".to_owned(),
                Self::BelowMinimum { min } => {
                    format!("قيمة الطلب أقل من الحد الأدنى للكوبون ({min})")
                }
                Self::NotApplicable => "الكوبون لا ينطبق على أي منتج في الطلب".to_owned(),
            },
        }
    }
}

/// Outcome of a successful coupon evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountQuote {
    pub discount: Money,
    pub final_total: Money,
}

impl Coupon {
    /// Check every redemption rule and compute the discount.
    ///
    /// # Errors
    ///
    /// Returns the first [`CouponRejection`] in evaluation order.
    pub fn evaluate(&self, ctx: &CouponContext<'_>) -> Result<DiscountQuote, CouponRejection> {
        if self.status != CouponStatus::Active {
            return Err(CouponRejection::Inactive);
        }

        if self.starts_at.is_some_and(|starts| starts > ctx.now) {
            return Err(CouponRejection::NotYetActive);
        }

        if self.expires_at.is_some_and(|expires| expires < ctx.now) {
            return Err(CouponRejection::Expired);
        }

        if self.is_exhausted() {
            return Err(CouponRejection::UsageLimitReached);
        }

        if &self.store_id != ctx.store_id {
            return Err(CouponRejection::WrongStore);
        }

        if let Some(min) = self.min_order_amount
            && ctx.order_total < min
        {
            return Err(CouponRejection::BelowMinimum { min });
        }

        if !self.product_ids.is_empty()
            && !ctx
                .product_ids
                .iter()
                .any(|id| self.product_ids.contains(id))
        {
            return Err(CouponRejection::NotApplicable);
        }

        let discount = self.discount_for(ctx.order_total);
        Ok(DiscountQuote {
            discount,
            final_total: ctx.order_total.saturating_sub(discount),
        })
    }

    /// Discount this coupon grants on `order_total`, ignoring eligibility.
    ///
    /// - `percentage`: `order_total * value / 100`, capped at `max_discount`
    /// - `fixed`: `value`
    ///
    /// Either way the discount never exceeds `order_total`.
    #[must_use]
    pub fn discount_for(&self, order_total: Money) -> Money {
        let raw = match self.discount_type {
            DiscountType::Percentage => {
                let pct = order_total.percent(self.value);
                match self.max_discount {
                    Some(cap) => pct.min(cap),
                    None => pct,
                }
            }
            DiscountType::Fixed => Money::new(self.value),
        };
        raw.min(order_total).max(Money::ZERO)
    }

    /// Whether the usage cap has been reached.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.usage_limit
            .is_some_and(|limit| self.used_count >= limit)
    }
}

/// Normalize a user-entered coupon code (trim, uppercase).
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Generate a random coupon code from an unambiguous alphabet.
#[must_use]
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..GENERATED_CODE_LENGTH)
        .filter_map(|_| {
            CODE_ALPHABET
                .get(rng.random_range(0..CODE_ALPHABET.len()))
                .copied()
                .map(char::from)
        })
        .collect()
}
