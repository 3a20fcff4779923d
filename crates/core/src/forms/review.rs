//! Review forms.

use serde::{Deserialize, Serialize};

use super::{ValidationErrors, Violation};
use crate::models::Rating;
use crate::types::ProductId;

/// Maximum comment length in characters.
pub const MAX_COMMENT_LENGTH: usize = 1000;

/// `POST /api/reviews` body.
///
/// `rating` is taken as a plain integer so an out-of-range value surfaces as
/// a field error instead of a body rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewForm {
    pub product_id: Option<ProductId>,
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

/// A validated new review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub product_id: ProductId,
    pub rating: Rating,
    pub comment: Option<String>,
}

impl ReviewForm {
    /// Validate every field.
    ///
    /// # Errors
    ///
    /// Returns the collected [`ValidationErrors`].
    pub fn validate(self) -> Result<NewReview, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.product_id.is_none() {
            errors.add("productId", Violation::Required);
        }
        let rating = match self.rating {
            Some(value) => check_rating(&mut errors, value),
            None => {
                errors.add("rating", Violation::Required);
                None
            }
        };
        let comment = errors.optional_text("comment", self.comment.as_deref(), MAX_COMMENT_LENGTH);

        match (self.product_id, rating) {
            (Some(product_id), Some(rating)) => errors.finish(NewReview {
                product_id,
                rating,
                comment,
            }),
            _ => Err(errors),
        }
    }
}

/// `PATCH /api/reviews/{id}` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReviewPatch {
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

/// Validated review changes, serialized as the document patch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReviewChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ReviewPatch {
    /// Validate the supplied fields.
    ///
    /// # Errors
    ///
    /// Returns the collected [`ValidationErrors`].
    pub fn validate(self) -> Result<ReviewChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let rating = self
            .rating
            .and_then(|value| check_rating(&mut errors, value));
        let comment = errors.optional_text("comment", self.comment.as_deref(), MAX_COMMENT_LENGTH);
        errors.finish(ReviewChanges { rating, comment })
    }
}

fn check_rating(errors: &mut ValidationErrors, value: i64) -> Option<Rating> {
    Rating::new(value)
        .inspect_err(|_| {
            errors.add(
                "rating",
                Violation::OutOfRange {
                    min: i64::from(Rating::MIN),
                    max: i64::from(Rating::MAX),
                },
            );
        })
        .ok()
}
