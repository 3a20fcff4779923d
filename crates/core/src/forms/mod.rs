//! Validation of client input.
//!
//! Each form is a `Deserialize` struct mirroring the JSON body a handler
//! accepts, with a `validate()` method that either produces the domain value
//! or a [`ValidationErrors`] listing every offending field. Errors carry a
//! [`Violation`] rather than a sentence so they can be rendered in the
//! request's locale.

pub mod account;
pub mod checkout;
pub mod coupon;
pub mod product;
pub mod review;
pub mod store;

use serde::Serialize;
use thiserror::Error;

use crate::types::{Locale, LocalizedText};

/// What is wrong with a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum Violation {
    /// Missing or blank.
    Required,
    /// Shorter than `min` characters.
    TooShort { min: usize },
    /// Longer than `max` characters.
    TooLong { max: usize },
    /// More than `max` entries.
    TooMany { max: usize },
    /// Outside `min..=max`.
    OutOfRange { min: i64, max: i64 },
    /// Must be strictly greater than zero.
    NotPositive,
    /// Must be zero or greater.
    Negative,
    /// Must be greater than another field.
    MustExceed { other: String },
    /// Not in the expected format.
    InvalidFormat,
    /// Refers to a product outside the store being edited.
    NotInStore,
}

impl Violation {
    /// Human-readable description in `locale`.
    #[must_use]
    pub fn message(&self, locale: Locale) -> String {
        match (self, locale) {
            (Self::Required, Locale::En) => "is required".to_owned(),
            (Self::Required, Locale::Ar) => "حقل مطلوب".to_owned(),
            (Self::TooShort { min }, Locale::En) => format!("must be at least {min} characters"),
            (Self::TooShort { min }, Locale::Ar) => format!("يجب ألا يقل عن {min} أحرف"),
            (Self::TooLong { max }, Locale::En) => format!("must be at most {max} characters"),
            (Self::TooLong { max }, Locale::Ar) => format!("يجب ألا يزيد عن {max} حرفًا"),
            (Self::TooMany { max }, Locale::En) => format!("must have at most {max} entries"),
            (Self::TooMany { max }, Locale::Ar) => format!("الحد الأقصى {max} عناصر"),
            (Self::OutOfRange { min, max }, Locale::En) => {
                format!("must be between {min} and {max}")
            }
            (Self::OutOfRange { min, max }, Locale::Ar) => {
                format!("يجب أن تكون القيمة بين {min} و {max}")
            }
            (Self::NotPositive, Locale::En) => "must be greater than zero".to_owned(),
            (Self::NotPositive, Locale::Ar) => "يجب أن تكون القيمة أكبر من صفر".to_owned(),
            (Self::Negative, Locale::En) => "cannot be negative".to_owned(),
            (Self::Negative, Locale::Ar) => "لا يمكن أن تكون القيمة سالبة".to_owned(),
            (Self::MustExceed { other }, Locale::En) => format!("must be greater than {other}"),
            (Self::MustExceed { other }, Locale::Ar) => format!("يجب أن تكون أكبر من {other}"),
            (Self::InvalidFormat, Locale::En) => "has an invalid format".to_owned(),
            (Self::InvalidFormat, Locale::Ar) => "صيغة غير صحيحة".to_owned(),
            (Self::NotInStore, Locale::En) => "is not a product of this store".to_owned(),
            (Self::NotInStore, Locale::Ar) => "ليس منتجًا في هذا المتجر".to_owned(),
        }
    }
}

/// A violation attached to a field path (`items[2].quantity`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    #[serde(flatten)]
    pub violation: Violation,
}

/// Every field-level problem found in one form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("validation failed: {}", summarize(&self.errors))]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} {}", e.field, e.violation.message(Locale::En)))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    /// Empty error set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Error set with a single entry.
    #[must_use]
    pub fn single(field: impl Into<String>, violation: Violation) -> Self {
        let mut errors = Self::new();
        errors.add(field, violation);
        errors
    }

    /// Record a violation.
    pub fn add(&mut self, field: impl Into<String>, violation: Violation) {
        self.errors.push(FieldError {
            field: field.into(),
            violation,
        });
    }

    /// Whether no violation was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// The recorded errors.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Whether `field` has a recorded violation.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// `Ok(value)` when no violation was recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one violation was recorded.
    pub fn finish<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }

    // -------------------------------------------------------------------------
    // Field checks shared by the forms
    // -------------------------------------------------------------------------

    /// Trimmed non-blank text no longer than `max` characters.
    pub fn required_text(&mut self, field: &str, value: &str, max: usize) -> String {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, Violation::Required);
        } else if trimmed.chars().count() > max {
            self.add(field, Violation::TooLong { max });
        }
        trimmed.to_owned()
    }

    /// Trimmed optional text; blank becomes `None`.
    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) -> Option<String> {
        let trimmed = value.map(str::trim).filter(|v| !v.is_empty())?;
        if trimmed.chars().count() > max {
            self.add(field, Violation::TooLong { max });
        }
        Some(trimmed.to_owned())
    }

    /// Bilingual text, trimmed. `required` demands at least one side.
    pub fn localized(
        &mut self,
        field: &str,
        value: &LocalizedText,
        required: bool,
        max: usize,
    ) -> LocalizedText {
        let text = value.trimmed();
        if required && text.is_blank() {
            self.add(field, Violation::Required);
        } else if text.max_chars() > max {
            self.add(field, Violation::TooLong { max });
        }
        text
    }

    /// Optional `http(s)` URL.
    pub fn optional_url(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        let url = self.optional_text(field, value, MAX_URL_LENGTH)?;
        if !is_http_url(&url) {
            self.add(field, Violation::InvalidFormat);
        }
        Some(url)
    }

    /// Optional phone number: digits, spaces, dashes and a leading `+`.
    pub fn optional_phone(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        let phone = self.optional_text(field, value, 20)?;
        if !is_phone(&phone) {
            self.add(field, Violation::InvalidFormat);
        }
        Some(phone)
    }
}

/// Maximum accepted URL length.
pub const MAX_URL_LENGTH: usize = 2048;

pub(crate) fn is_http_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    rest.is_some_and(|r| !r.is_empty() && !r.contains(char::is_whitespace))
}

pub(crate) fn is_phone(value: &str) -> bool {
    let body = value.strip_prefix('+').unwrap_or(value);
    let digits = body.chars().filter(char::is_ascii_digit).count();
    digits >= 7 && body.chars().all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_finish() {
        assert_eq!(ValidationErrors::new().finish(7).unwrap(), 7);

        let errors = ValidationErrors::single("name", Violation::Required);
        assert!(errors.clone().finish(7).is_err());
        assert!(errors.has("name"));
    }

    #[test]
    fn test_display_lists_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("price", Violation::NotPositive);
        errors.add("name", Violation::Required);
        assert_eq!(
            errors.to_string(),
            "validation failed: price must be greater than zero; name is required"
        );
    }

    #[test]
    fn test_required_text_trims() {
        let mut errors = ValidationErrors::new();
        assert_eq!(errors.required_text("name", "  Souq  ", 10), "Souq");
        assert!(errors.is_empty());

        errors.required_text("title", "   ", 10);
        errors.required_text("slug", "abcdefghijk", 10);
        assert_eq!(errors.errors()[0].violation, Violation::Required);
        assert_eq!(errors.errors()[1].violation, Violation::TooLong { max: 10 });
    }

    #[test]
    fn test_optional_url_and_phone() {
        let mut errors = ValidationErrors::new();
        assert_eq!(errors.optional_url("logo", Some(" ")), None);
        errors.optional_url("logo", Some("ftp://x"));
        errors.optional_phone("phone", Some("+966 50-123-4567"));
        errors.optional_phone("mobile", Some("call me"));
        assert!(errors.has("logo"));
        assert!(!errors.has("phone"));
        assert!(errors.has("mobile"));
    }

    #[test]
    fn test_field_error_serializes_flat() {
        let error = FieldError {
            field: "rating".to_owned(),
            violation: Violation::OutOfRange { min: 1, max: 5 },
        };
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"field": "rating", "code": "out_of_range", "min": 1, "max": 5})
        );
    }
}
