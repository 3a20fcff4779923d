//! Marketplace entities.
//!
//! These are the shapes stored as documents (camelCase JSON) and returned by
//! the API. Business rules that only need the entity itself - coupon
//! evaluation, order status transitions, rating aggregation - live beside the
//! type they govern.

pub mod coupon;
pub mod order;
pub mod product;
pub mod review;
pub mod store;
pub mod user;
pub mod wishlist;

pub use coupon::{
    Coupon, CouponContext, CouponRejection, DiscountQuote, GENERATED_CODE_LENGTH, generate_code,
    normalize_code,
};
pub use order::{Order, OrderItem, OrderTotals, ShippingAddress, StatusChange, TransitionError};
pub use product::Product;
pub use review::{Rating, RatingError, RatingSummary, Review};
pub use store::Store;
pub use user::User;
pub use wishlist::WishlistItem;
