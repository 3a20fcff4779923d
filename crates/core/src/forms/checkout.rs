//! Checkout form.

use serde::Deserialize;

use super::{ValidationErrors, Violation};
use crate::models::{ShippingAddress, normalize_code};
use crate::types::{ProductId, StoreId};

/// Per-line quantity bounds.
pub const QUANTITY_RANGE: std::ops::RangeInclusive<i64> = 1..=100;
/// Maximum distinct products per order.
pub const MAX_LINES: usize = 50;

/// `POST /api/orders` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutForm {
    pub store_id: Option<StoreId>,
    pub items: Vec<CartLine>,
    pub coupon_code: Option<String>,
    pub shipping_address: AddressForm,
}

/// One requested product. Any price the client sends is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Delivery address as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressForm {
    pub full_name: String,
    pub phone: String,
    pub city: String,
    pub street: String,
    pub notes: Option<String>,
}

/// A validated cart, with duplicate products merged in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    pub store_id: StoreId,
    pub items: Vec<(ProductId, u32)>,
    pub coupon_code: Option<String>,
    pub shipping_address: ShippingAddress,
}

impl CheckoutForm {
    /// Validate the cart and address.
    ///
    /// # Errors
    ///
    /// Returns the collected [`ValidationErrors`].
    pub fn validate(self) -> Result<Checkout, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.store_id.is_none() {
            errors.add("storeId", Violation::Required);
        }

        if self.items.is_empty() {
            errors.add("items", Violation::Required);
        }
        let mut merged: Vec<(ProductId, i64)> = Vec::with_capacity(self.items.len());
        for (i, line) in self.items.into_iter().enumerate() {
            if !QUANTITY_RANGE.contains(&line.quantity) {
                errors.add(
                    format!("items[{i}].quantity"),
                    Violation::OutOfRange {
                        min: *QUANTITY_RANGE.start(),
                        max: *QUANTITY_RANGE.end(),
                    },
                );
                continue;
            }
            match merged.iter_mut().find(|(id, _)| *id == line.product_id) {
                Some((_, quantity)) => *quantity += line.quantity,
                None => merged.push((line.product_id, line.quantity)),
            }
        }
        if merged.len() > MAX_LINES {
            errors.add("items", Violation::TooMany { max: MAX_LINES });
        }

        let mut items = Vec::with_capacity(merged.len());
        for (product_id, quantity) in merged {
            match u32::try_from(quantity) {
                Ok(quantity) if QUANTITY_RANGE.contains(&i64::from(quantity)) => {
                    items.push((product_id, quantity));
                }
                _ => errors.add(
                    format!("items.{product_id}"),
                    Violation::OutOfRange {
                        min: *QUANTITY_RANGE.start(),
                        max: *QUANTITY_RANGE.end(),
                    },
                ),
            }
        }

        let coupon_code = self
            .coupon_code
            .as_deref()
            .map(normalize_code)
            .filter(|code| !code.is_empty());

        let address = &self.shipping_address;
        let shipping_address = ShippingAddress {
            full_name: errors.required_text("shippingAddress.fullName", &address.full_name, 100),
            phone: errors.required_text("shippingAddress.phone", &address.phone, 20),
            city: errors.required_text("shippingAddress.city", &address.city, 80),
            street: errors.required_text("shippingAddress.street", &address.street, 200),
            notes: errors.optional_text("shippingAddress.notes", address.notes.as_deref(), 500),
        };
        if !shipping_address.phone.is_empty() && !super::is_phone(&shipping_address.phone) {
            errors.add("shippingAddress.phone", Violation::InvalidFormat);
        }

        match self.store_id {
            Some(store_id) => errors.finish(Checkout {
                store_id,
                items,
                coupon_code,
                shipping_address,
            }),
            None => Err(errors),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(id: &str, quantity: i64) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            quantity,
        }
    }

    fn form(items: Vec<CartLine>) -> CheckoutForm {
        CheckoutForm {
            store_id: Some(StoreId::new("s1")),
            items,
            coupon_code: Some(" eid ".to_owned()),
            shipping_address: AddressForm {
                full_name: "Noura Saleh".to_owned(),
                phone: "+966500000000".to_owned(),
                city: "Riyadh".to_owned(),
                street: "Olaya St".to_owned(),
                notes: None,
            },
        }
    }

    #[test]
    fn test_duplicates_merged_in_order() {
        let checkout = form(vec![line("p2", 1), line("p1", 2), line("p2", 3)])
            .validate()
            .unwrap();
        assert_eq!(
            checkout.items,
            vec![(ProductId::new("p2"), 4), (ProductId::new("p1"), 2)]
        );
        assert_eq!(checkout.coupon_code.as_deref(), Some("EID"));
    }

    #[test]
    fn test_empty_cart_rejected() {
        assert!(form(vec![]).validate().unwrap_err().has("items"));
    }

    #[test]
    fn test_quantity_bounds() {
        let errors = form(vec![line("p1", 0), line("p2", 101)])
            .validate()
            .unwrap_err();
        assert!(errors.has("items[0].quantity"));
        assert!(errors.has("items[1].quantity"));
    }

    #[test]
    fn test_merged_quantity_over_limit() {
        let errors = form(vec![line("p1", 60), line("p1", 60)])
            .validate()
            .unwrap_err();
        assert!(errors.has("items.p1"));
    }

    #[test]
    fn test_client_price_ignored() {
        let form: CheckoutForm = serde_json::from_value(serde_json::json!({
            "storeId": "s1",
            "items": [{"productId": "p1", "quantity": 1, "price": 0.01}],
            "shippingAddress": {
                "fullName": "A", "phone": "0500000000", "city": "Riyadh", "street": "X"
            }
        }))
        .unwrap();
        let checkout = form.validate().unwrap();
        assert_eq!(checkout.items, vec![(ProductId::new("p1"), 1)]);
        assert_eq!(checkout.coupon_code, None);
    }

    #[test]
    fn test_address_required() {
        let errors = CheckoutForm {
            shipping_address: AddressForm::default(),
            ..form(vec![line("p1", 1)])
        }
        .validate()
        .unwrap_err();
        assert!(errors.has("shippingAddress.fullName"));
        assert!(errors.has("shippingAddress.street"));
    }
}
