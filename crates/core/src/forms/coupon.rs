//! Coupon forms.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::{ValidationErrors, Violation};
use crate::models::{Coupon, generate_code, normalize_code};
use crate::types::{CouponStatus, DiscountType, Money, ProductId, StoreId, Timestamp};

/// Code length bounds after normalization.
pub const CODE_LENGTH: std::ops::RangeInclusive<usize> = 3..=32;

/// `POST /api/coupons` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CouponForm {
    /// Required for admins; sellers always create for their own store.
    pub store_id: Option<StoreId>,
    /// Left blank, a code is generated.
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub discount_type: Option<DiscountType>,
    pub value: Option<Decimal>,
    pub min_order_amount: Option<Money>,
    pub max_discount: Option<Money>,
    pub usage_limit: Option<i64>,
    pub starts_at: Option<Timestamp>,
    pub expires_at: Option<Timestamp>,
    pub status: Option<CouponStatus>,
    pub product_ids: Vec<ProductId>,
}

/// A validated new coupon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCoupon {
    pub store_id: Option<StoreId>,
    pub code: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub min_order_amount: Option<Money>,
    pub max_discount: Option<Money>,
    pub usage_limit: Option<u64>,
    pub starts_at: Option<Timestamp>,
    pub expires_at: Option<Timestamp>,
    pub status: CouponStatus,
    pub product_ids: Vec<ProductId>,
}

/// The rule-bearing fields of a coupon, checked together.
struct Terms {
    discount_type: DiscountType,
    value: Decimal,
    min_order_amount: Option<Money>,
    max_discount: Option<Money>,
    starts_at: Option<Timestamp>,
    expires_at: Option<Timestamp>,
}

impl Terms {
    fn check(&self, errors: &mut ValidationErrors) {
        if self.value <= Decimal::ZERO {
            errors.add("value", Violation::NotPositive);
        } else if self.discount_type == DiscountType::Percentage
            && self.value > Decimal::ONE_HUNDRED
        {
            errors.add("value", Violation::OutOfRange { min: 1, max: 100 });
        }

        if self.min_order_amount.is_some_and(|m| m.is_negative()) {
            errors.add("minOrderAmount", Violation::Negative);
        }
        if self.max_discount.is_some_and(|m| !m.is_positive()) {
            errors.add("maxDiscount", Violation::NotPositive);
        }

        if let (Some(starts), Some(expires)) = (self.starts_at, self.expires_at)
            && expires <= starts
        {
            errors.add(
                "expiresAt",
                Violation::MustExceed {
                    other: "startsAt".to_owned(),
                },
            );
        }
    }
}

impl CouponForm {
    /// Validate every field and normalize the code.
    ///
    /// # Errors
    ///
    /// Returns the collected [`ValidationErrors`].
    pub fn validate(self) -> Result<NewCoupon, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let code = match self.code.as_deref().map(normalize_code) {
            Some(code) if !code.is_empty() => check_code(&mut errors, code),
            _ => generate_code(),
        };

        if self.discount_type.is_none() {
            errors.add("type", Violation::Required);
        }
        if self.value.is_none() {
            errors.add("value", Violation::Required);
        }
        let usage_limit = check_usage_limit(&mut errors, self.usage_limit);

        let terms = Terms {
            discount_type: self.discount_type.unwrap_or(DiscountType::Fixed),
            value: self.value.unwrap_or(Decimal::ONE),
            min_order_amount: self.min_order_amount,
            max_discount: self.max_discount,
            starts_at: self.starts_at,
            expires_at: self.expires_at,
        };
        terms.check(&mut errors);

        errors.finish(NewCoupon {
            store_id: self.store_id,
            code,
            discount_type: terms.discount_type,
            value: terms.value,
            min_order_amount: terms.min_order_amount,
            max_discount: terms.max_discount,
            usage_limit,
            starts_at: terms.starts_at,
            expires_at: terms.expires_at,
            status: self.status.unwrap_or_default(),
            product_ids: dedup(self.product_ids),
        })
    }
}

/// `PATCH /api/coupons/{id}` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CouponPatch {
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub discount_type: Option<DiscountType>,
    pub value: Option<Decimal>,
    /// `null` removes the minimum.
    #[serde(deserialize_with = "nullable")]
    pub min_order_amount: Option<Option<Money>>,
    #[serde(deserialize_with = "nullable")]
    pub max_discount: Option<Option<Money>>,
    #[serde(deserialize_with = "nullable")]
    pub usage_limit: Option<Option<i64>>,
    #[serde(deserialize_with = "nullable")]
    pub starts_at: Option<Option<Timestamp>>,
    #[serde(deserialize_with = "nullable")]
    pub expires_at: Option<Option<Timestamp>>,
    pub status: Option<CouponStatus>,
    pub product_ids: Option<Vec<ProductId>>,
}

/// Validated coupon changes, serialized as the document patch.
///
/// `Some(None)` serializes as `null` and clears the stored field.
/// `usedCount` is only ever changed by checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub discount_type: Option<DiscountType>,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_order_amount: Option<Option<Money>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_discount: Option<Option<Money>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<Option<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<Option<Timestamp>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Option<Timestamp>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CouponStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_ids: Option<Vec<ProductId>>,
}

impl CouponPatch {
    /// Validate the supplied fields merged over `current`.
    ///
    /// # Errors
    ///
    /// Returns the collected [`ValidationErrors`].
    pub fn validate(self, current: &Coupon) -> Result<CouponChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let code = self
            .code
            .as_deref()
            .map(|code| check_code(&mut errors, normalize_code(code)));
        let usage_limit = self
            .usage_limit
            .map(|limit| check_usage_limit(&mut errors, limit));

        Terms {
            discount_type: self.discount_type.unwrap_or(current.discount_type),
            value: self.value.unwrap_or(current.value),
            min_order_amount: self.min_order_amount.unwrap_or(current.min_order_amount),
            max_discount: self.max_discount.unwrap_or(current.max_discount),
            starts_at: self.starts_at.unwrap_or(current.starts_at),
            expires_at: self.expires_at.unwrap_or(current.expires_at),
        }
        .check(&mut errors);

        errors.finish(CouponChanges {
            code,
            discount_type: self.discount_type,
            value: self.value,
            min_order_amount: self.min_order_amount,
            max_discount: self.max_discount,
            usage_limit,
            starts_at: self.starts_at,
            expires_at: self.expires_at,
            status: self.status,
            product_ids: self.product_ids.map(dedup),
        })
    }
}

/// `POST /api/coupons/validate` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidateCouponForm {
    pub code: String,
    pub store_id: Option<StoreId>,
    pub order_total: Option<Money>,
    pub product_ids: Vec<ProductId>,
}

/// A validated coupon lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponCheck {
    pub code: String,
    pub store_id: StoreId,
    pub order_total: Money,
    pub product_ids: Vec<ProductId>,
}

impl ValidateCouponForm {
    /// Check the lookup is complete.
    ///
    /// # Errors
    ///
    /// Returns the collected [`ValidationErrors`].
    pub fn validate(self) -> Result<CouponCheck, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let code = normalize_code(&self.code);
        if code.is_empty() {
            errors.add("code", Violation::Required);
        }
        if self.store_id.is_none() {
            errors.add("storeId", Violation::Required);
        }
        match self.order_total {
            None => errors.add("orderTotal", Violation::Required),
            Some(total) if total.is_negative() => errors.add("orderTotal", Violation::Negative),
            Some(_) => {}
        }

        match self.store_id {
            Some(store_id) => errors.finish(CouponCheck {
                code,
                store_id,
                order_total: self.order_total.unwrap_or_default(),
                product_ids: self.product_ids,
            }),
            None => Err(errors),
        }
    }
}

/// Whether a normalized code is 3-32 characters of `[A-Z0-9_-]`.
#[must_use]
pub fn is_valid_code(code: &str) -> bool {
    CODE_LENGTH.contains(&code.len())
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
}

fn check_code(errors: &mut ValidationErrors, code: String) -> String {
    if !is_valid_code(&code) {
        errors.add("code", Violation::InvalidFormat);
    }
    code
}

fn check_usage_limit(errors: &mut ValidationErrors, limit: Option<i64>) -> Option<u64> {
    let limit = limit?;
    match u64::try_from(limit) {
        Ok(limit) if limit >= 1 => Some(limit),
        _ => {
            errors.add("usageLimit", Violation::NotPositive);
            None
        }
    }
}

/// Present-but-`null` becomes `Some(None)`; an absent field stays `None`
/// through the container `default`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn dedup(mut ids: Vec<ProductId>) -> Vec<ProductId> {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(id.clone()));
    ids
}
