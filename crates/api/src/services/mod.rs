//! Business operations that span several repositories.
//!
//! Handlers validate input with the `souq-core` forms, then call into a
//! service. Services enforce ownership and cross-document rules and return
//! [`AppError`](crate::error::AppError) so handlers can use `?` directly.

pub mod auth;
pub mod checkout;
pub mod coupons;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod stores;

pub use auth::{AuthError, AuthService};
pub use checkout::CheckoutService;
pub use coupons::{CouponService, CouponValidation};
pub use orders::{OrderScope, OrderService};
pub use products::ProductService;
pub use reviews::ReviewService;
pub use stores::StoreService;
