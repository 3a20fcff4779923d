//! Product creation and update forms.

use serde::{Deserialize, Serialize};

use super::{ValidationErrors, Violation, is_http_url};
use crate::models::Product;
use crate::types::{LocalizedText, Money, ProductStatus, StoreId};

/// Maximum number of images per product.
pub const MAX_IMAGES: usize = 10;
const MAX_NAME: usize = 200;
const MAX_DESCRIPTION: usize = 5000;
const MAX_CATEGORY: usize = 64;

/// `POST /api/products` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductForm {
    /// Required for admins; sellers always list into their own store.
    pub store_id: Option<StoreId>,
    pub name: LocalizedText,
    pub description: LocalizedText,
    pub category: String,
    pub price: Option<Money>,
    pub compare_at_price: Option<Money>,
    pub stock: Option<i64>,
    pub images: Vec<String>,
    pub status: Option<ProductStatus>,
}

/// A validated new product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub store_id: Option<StoreId>,
    pub name: LocalizedText,
    pub description: LocalizedText,
    pub category: String,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    pub stock: i64,
    pub images: Vec<String>,
    pub status: ProductStatus,
}

impl ProductForm {
    /// Validate every field.
    ///
    /// # Errors
    ///
    /// Returns the collected [`ValidationErrors`].
    pub fn validate(self) -> Result<NewProduct, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = errors.localized("name", &self.name, true, MAX_NAME);
        let description = errors.localized("description", &self.description, false, MAX_DESCRIPTION);
        let category = errors.required_text("category", &self.category, MAX_CATEGORY);

        let price = self.price.unwrap_or_default();
        if self.price.is_none() {
            errors.add("price", Violation::Required);
        } else {
            check_price(&mut errors, price, self.compare_at_price);
        }

        let stock = self.stock.unwrap_or(0);
        check_stock(&mut errors, stock);
        check_images(&mut errors, &self.images);

        errors.finish(NewProduct {
            store_id: self.store_id,
            name,
            description,
            category,
            price,
            compare_at_price: self.compare_at_price,
            stock,
            images: self.images.iter().map(|url| url.trim().to_owned()).collect(),
            status: self.status.unwrap_or_default(),
        })
    }
}

/// `PATCH /api/products/{id}` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductPatch {
    pub name: Option<LocalizedText>,
    pub description: Option<LocalizedText>,
    pub category: Option<String>,
    pub price: Option<Money>,
    pub compare_at_price: Option<Money>,
    pub stock: Option<i64>,
    pub images: Option<Vec<String>>,
    pub status: Option<ProductStatus>,
}

/// Validated product changes, serialized as the document patch.
///
/// Counters (`views`, `sales`, `rating`) are never part of a patch so a
/// concurrent increment is not overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<LocalizedText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<LocalizedText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compare_at_price: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
}

impl ProductPatch {
    /// Validate the supplied fields against `current`.
    ///
    /// Price rules are checked on the merged result, so lowering `price`
    /// below an existing `compareAtPrice` is accepted while raising it above
    /// is not.
    ///
    /// # Errors
    ///
    /// Returns the collected [`ValidationErrors`].
    pub fn validate(self, current: &Product) -> Result<ProductChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = self
            .name
            .map(|name| errors.localized("name", &name, true, MAX_NAME));
        let description = self
            .description
            .map(|d| errors.localized("description", &d, false, MAX_DESCRIPTION));
        let category = self
            .category
            .map(|c| errors.required_text("category", &c, MAX_CATEGORY));

        if self.price.is_some() || self.compare_at_price.is_some() {
            check_price(
                &mut errors,
                self.price.unwrap_or(current.price),
                self.compare_at_price.or(current.compare_at_price),
            );
        }
        if let Some(stock) = self.stock {
            check_stock(&mut errors, stock);
        }
        if let Some(images) = &self.images {
            check_images(&mut errors, images);
        }

        errors.finish(ProductChanges {
            name,
            description,
            category,
            price: self.price,
            compare_at_price: self.compare_at_price,
            stock: self.stock,
            images: self
                .images
                .map(|images| images.iter().map(|url| url.trim().to_owned()).collect()),
            status: self.status,
        })
    }
}

fn check_price(errors: &mut ValidationErrors, price: Money, compare_at: Option<Money>) {
    if !price.is_positive() {
        errors.add("price", Violation::NotPositive);
    }
    if let Some(compare_at) = compare_at
        && compare_at <= price
    {
        errors.add(
            "compareAtPrice",
            Violation::MustExceed {
                other: "price".to_owned(),
            },
        );
    }
}

fn check_stock(errors: &mut ValidationErrors, stock: i64) {
    if stock < 0 {
        errors.add("stock", Violation::Negative);
    }
}

fn check_images(errors: &mut ValidationErrors, images: &[String]) {
    if images.len() > MAX_IMAGES {
        errors.add("images", Violation::TooMany { max: MAX_IMAGES });
    }
    for (i, url) in images.iter().enumerate() {
        if !is_http_url(url.trim()) {
            errors.add(format!("images[{i}]"), Violation::InvalidFormat);
        }
    }
}
