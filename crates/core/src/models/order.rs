//! Orders and their status history.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{
    CurrencyCode, LocalizedText, Money, OrderId, OrderStatus, ProductId, StoreId, Timestamp,
    UserId,
};

/// A purchase from a single store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub store_id: StoreId,
    pub items: Vec<OrderItem>,
    /// Denormalized from `items` so orders can be found by product with an
    /// array-contains filter.
    pub product_ids: Vec<ProductId>,
    pub subtotal: Money,
    pub discount: Money,
    pub shipping_fee: Money,
    pub total: Money,
    pub currency: CurrencyCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    pub shipping_address: ShippingAddress,
    pub status: OrderStatus,
    /// Append-only log of every status the order has been in.
    pub status_history: Vec<StatusChange>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One purchased line, priced at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: LocalizedText,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

impl OrderItem {
    /// Price a line from the stored unit price.
    #[must_use]
    pub fn new(product_id: ProductId, name: LocalizedText, unit_price: Money, quantity: u32) -> Self {
        Self {
            product_id,
            name,
            unit_price,
            quantity,
            line_total: unit_price.times(quantity),
        }
    }
}

/// Where to deliver an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub city: String,
    pub street: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// An entry in an order's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: OrderStatus,
    pub at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A rejected status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot move order from {from} to {to}")]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// Monetary breakdown of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub shipping_fee: Money,
    pub total: Money,
}

impl OrderTotals {
    /// `total = subtotal - discount + shipping`, with the discount clamped to
    /// the subtotal.
    #[must_use]
    pub fn compute(items: &[OrderItem], discount: Money, shipping_fee: Money) -> Self {
        let subtotal: Money = items.iter().map(|item| item.line_total).sum();
        let discount = discount.min(subtotal);
        Self {
            subtotal,
            discount,
            shipping_fee,
            total: subtotal.saturating_sub(discount) + shipping_fee,
        }
    }
}

impl Order {
    /// Validate a move to `next` and build the history entry for it.
    ///
    /// The order itself is not modified; callers persist the new status and
    /// append the returned entry.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when the status table forbids the move.
    pub fn transition(
        &self,
        next: OrderStatus,
        by: Option<UserId>,
        note: Option<String>,
    ) -> Result<StatusChange, TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }

        Ok(StatusChange {
            status: next,
            at: Timestamp::now(),
            by,
            note,
        })
    }

    /// Whether `user_id` placed this order.
    #[must_use]
    pub fn is_placed_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// Whether the buyer may still cancel.
    #[must_use]
    pub fn is_cancellable_by_buyer(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn unit_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::*;

    fn money(s: &str) -> Money {
        Money::new(Decimal::from_str(s).unwrap())
    }

    fn item(id: &str, price: &str, quantity: u32) -> OrderItem {
        OrderItem::new(
            ProductId::new(id),
            LocalizedText::new("منتج", "Product"),
            money(price),
            quantity,
        )
    }

    fn order(status: OrderStatus) -> Order {
        let now = Timestamp::now();
        let items = vec![item("p1", "25.50", 2), item("p2", "10", 1)];
        let totals = OrderTotals::compute(&items, Money::ZERO, money("15"));
        Order {
            id: OrderId::new("o1"),
            user_id: UserId::new("u1"),
            store_id: StoreId::new("s1"),
            product_ids: items.iter().map(|i| i.product_id.clone()).collect(),
            items,
            subtotal: totals.subtotal,
            discount: totals.discount,
            shipping_fee: totals.shipping_fee,
            total: totals.total,
            currency: CurrencyCode::SAR,
            coupon_code: None,
            shipping_address: ShippingAddress {
                full_name: "Noura Saleh".to_owned(),
                phone: "+966500000000".to_owned(),
                city: "Riyadh".to_owned(),
                street: "King Fahd Rd".to_owned(),
                notes: None,
            },
            status,
            status_history: vec![StatusChange {
                status,
                at: now,
                by: None,
                note: None,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_totals() {
        let items = vec![item("p1", "25.50", 2), item("p2", "10", 1)];
        let totals = OrderTotals::compute(&items, money("6"), money("15"));
        assert_eq!(totals.subtotal, money("61"));
        assert_eq!(totals.total, money("70"));
    }

    #[test]
    fn test_totals_clamp_discount_to_subtotal() {
        let items = vec![item("p1", "20", 1)];
        let totals = OrderTotals::compute(&items, money("50"), money("10"));
        assert_eq!(totals.discount, money("20"));
        assert_eq!(totals.total, money("10"));
    }

    #[test]
    fn test_transition_builds_history_entry() {
        let o = order(OrderStatus::Pending);
        let change = o
            .transition(OrderStatus::Confirmed, Some(UserId::new("seller")), None)
            .unwrap();
        assert_eq!(change.status, OrderStatus::Confirmed);
        assert_eq!(change.by, Some(UserId::new("seller")));
        // The order is untouched until the caller persists the change.
        assert_eq!(o.status_history.len(), 1);
    }

    #[test]
    fn test_transition_rejected() {
        let o = order(OrderStatus::Delivered);
        let err = o.transition(OrderStatus::Pending, None, None).unwrap_err();
        assert_eq!(
            err,
            TransitionError {
                from: OrderStatus::Delivered,
                to: OrderStatus::Pending
            }
        );
        assert_eq!(err.to_string(), "cannot move order from delivered to pending");
    }

    #[test]
    fn test_buyer_cancellation_window() {
        assert!(order(OrderStatus::Pending).is_cancellable_by_buyer());
        assert!(!order(OrderStatus::Confirmed).is_cancellable_by_buyer());
    }

    #[test]
    fn test_unit_count() {
        assert_eq!(order(OrderStatus::Pending).unit_count(), 3);
    }
}
