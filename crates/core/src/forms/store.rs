//! Store creation and update forms.

use serde::{Deserialize, Serialize};

use super::{ValidationErrors, Violation};
use crate::types::{LocalizedText, Money, StoreStatus};

/// Slug length bounds.
pub const SLUG_LENGTH: std::ops::RangeInclusive<usize> = 3..=64;
const MAX_NAME: usize = 120;
const MAX_DESCRIPTION: usize = 2000;
const MAX_CITY: usize = 80;

/// `POST /api/stores` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreForm {
    pub name: LocalizedText,
    pub slug: String,
    pub description: LocalizedText,
    pub logo_url: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub shipping_fee: Option<Money>,
}

/// A validated new store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStore {
    pub name: LocalizedText,
    pub slug: String,
    pub description: LocalizedText,
    pub logo_url: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub shipping_fee: Money,
}

impl StoreForm {
    /// Validate every field. The slug is lowercased before checking.
    ///
    /// # Errors
    ///
    /// Returns the collected [`ValidationErrors`].
    pub fn validate(self) -> Result<NewStore, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = errors.localized("name", &self.name, true, MAX_NAME);
        let slug = check_slug(&mut errors, &self.slug);
        let description = errors.localized("description", &self.description, false, MAX_DESCRIPTION);
        let logo_url = errors.optional_url("logoUrl", self.logo_url.as_deref());
        let city = errors.optional_text("city", self.city.as_deref(), MAX_CITY);
        let phone = errors.optional_phone("phone", self.phone.as_deref());
        let shipping_fee = self.shipping_fee.unwrap_or_default();
        if shipping_fee.is_negative() {
            errors.add("shippingFee", Violation::Negative);
        }

        errors.finish(NewStore {
            name,
            slug,
            description,
            logo_url,
            city,
            phone,
            shipping_fee,
        })
    }
}

/// `PATCH /api/stores/{id}` body. The status has its own endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorePatch {
    pub name: Option<LocalizedText>,
    pub slug: Option<String>,
    pub description: Option<LocalizedText>,
    pub logo_url: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub shipping_fee: Option<Money>,
}

/// Validated store changes, serialized as the document patch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<LocalizedText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<LocalizedText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_fee: Option<Money>,
}

impl StorePatch {
    /// Validate the supplied fields.
    ///
    /// # Errors
    ///
    /// Returns the collected [`ValidationErrors`].
    pub fn validate(self) -> Result<StoreChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = self
            .name
            .map(|name| errors.localized("name", &name, true, MAX_NAME));
        let slug = self.slug.map(|slug| check_slug(&mut errors, &slug));
        let description = self
            .description
            .map(|d| errors.localized("description", &d, false, MAX_DESCRIPTION));
        let logo_url = errors.optional_url("logoUrl", self.logo_url.as_deref());
        let city = errors.optional_text("city", self.city.as_deref(), MAX_CITY);
        let phone = errors.optional_phone("phone", self.phone.as_deref());
        if self.shipping_fee.is_some_and(|fee| fee.is_negative()) {
            errors.add("shippingFee", Violation::Negative);
        }

        errors.finish(StoreChanges {
            name,
            slug,
            description,
            logo_url,
            city,
            phone,
            shipping_fee: self.shipping_fee,
        })
    }
}

/// `PATCH /api/stores/{id}/status` body.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StoreStatusForm {
    pub status: StoreStatus,
}

/// Whether `slug` is 3-64 characters of `[a-z0-9-]`.
#[must_use]
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_LENGTH.contains(&slug.len())
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

fn check_slug(errors: &mut ValidationErrors, slug: &str) -> String {
    let slug = slug.trim().to_ascii_lowercase();
    if slug.is_empty() {
        errors.add("slug", Violation::Required);
    } else if !is_valid_slug(&slug) {
        errors.add("slug", Violation::InvalidFormat);
    }
    slug
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn form() -> StoreForm {
        StoreForm {
            name: LocalizedText::new("دار العود", "Oud House"),
            slug: " Oud-House ".to_owned(),
            ..StoreForm::default()
        }
    }

    #[test]
    fn test_slug_rules() {
        assert!(is_valid_slug("oud-house-2"));
        assert!(!is_valid_slug("ab"));
        assert!(!is_valid_slug("oud_house"));
        assert!(!is_valid_slug("عود"));
        assert!(!is_valid_slug(&"a".repeat(65)));
    }

    #[test]
    fn test_create_lowercases_slug() {
        let store = form().validate().unwrap();
        assert_eq!(store.slug, "oud-house");
        assert_eq!(store.shipping_fee, Money::ZERO);
    }

    #[test]
    fn test_create_requires_name() {
        let errors = StoreForm {
            name: LocalizedText::default(),
            ..form()
        }
        .validate()
        .unwrap_err();
        assert!(errors.has("name"));
    }

    #[test]
    fn test_negative_shipping_fee() {
        let errors = StoreForm {
            shipping_fee: Some(Money::new(Decimal::from(-5))),
            ..form()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.errors()[0].violation, Violation::Negative);
    }

    #[test]
    fn test_patch_ignores_status() {
        let patch: StorePatch =
            serde_json::from_str(r#"{"city":"Jeddah","status":"active"}"#).unwrap();
        let changes = patch.validate().unwrap();
        assert_eq!(
            serde_json::to_value(&changes).unwrap(),
            serde_json::json!({"city": "Jeddah"})
        );
    }
}
