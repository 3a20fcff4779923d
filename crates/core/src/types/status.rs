//! Status enums for marketplace entities.
//!
//! All statuses serialize as lowercase strings so they can be used directly as
//! equality filter values in document queries.

use serde::{Deserialize, Serialize};

/// Implements `as_str`, `Display` and `FromStr` for a lowercase status enum.
macro_rules! status_strings {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Wire representation of the status.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("invalid ", stringify!($name), ": {}"), s)),
                }
            }
        }
    };
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

status_strings!(OrderStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
    Refunded => "refunded",
});

impl OrderStatus {
    /// Statuses reachable in one step from `self`.
    #[must_use]
    pub const fn next_statuses(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Confirmed, Self::Cancelled],
            Self::Confirmed => &[Self::Processing, Self::Cancelled],
            Self::Processing => &[Self::Shipped, Self::Cancelled],
            Self::Shipped => &[Self::Delivered],
            Self::Delivered => &[Self::Refunded],
            Self::Cancelled | Self::Refunded => &[],
        }
    }

    /// Whether moving from `self` to `next` is allowed.
    ///
    /// Re-applying the current status is not a transition.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.next_statuses().contains(&next)
    }

    /// Terminal statuses accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.next_statuses().is_empty()
    }

    /// Every status, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::Confirmed,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
        Self::Refunded,
    ];
}

/// Seller store approval status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreStatus {
    /// Awaiting admin approval.
    #[default]
    Pending,
    /// Visible in the storefront.
    Active,
    /// Hidden by an admin.
    Suspended,
}

status_strings!(StoreStatus {
    Pending => "pending",
    Active => "active",
    Suspended => "suspended",
});

impl StoreStatus {
    /// Whether an admin may move a store from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending | Self::Suspended, Self::Active) | (Self::Active, Self::Suspended)
        )
    }

    /// Every status.
    pub const ALL: [Self; 3] = [Self::Pending, Self::Active, Self::Suspended];
}

/// Product listing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    /// Not yet visible to shoppers.
    Draft,
    /// Listed and purchasable.
    #[default]
    Active,
    /// Withdrawn from sale.
    Archived,
}

status_strings!(ProductStatus {
    Draft => "draft",
    Active => "active",
    Archived => "archived",
});

/// Whether a coupon may currently be redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CouponStatus {
    #[default]
    Active,
    Inactive,
}

status_strings!(CouponStatus {
    Active => "active",
    Inactive => "inactive",
});

/// How a coupon's value is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `value` percent of the order total.
    Percentage,
    /// `value` currency units off the order total.
    Fixed,
}

status_strings!(DiscountType {
    Percentage => "percentage",
    Fixed => "fixed",
});

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Shopper.
    #[default]
    Customer,
    /// Owns a store and manages its products, coupons and orders.
    Seller,
    /// Full access to every store and the moderation surface.
    Admin,
}

status_strings!(UserRole {
    Customer => "customer",
    Seller => "seller",
    Admin => "admin",
});

impl UserRole {
    /// Sellers and admins may manage catalog data.
    #[must_use]
    pub const fn can_sell(self) -> bool {
        matches!(self, Self::Seller | Self::Admin)
    }
}
