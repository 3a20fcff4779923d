//! Souq Core - Domain types and business rules.
//!
//! This crate provides the types shared by the Souq marketplace components:
//! - `api` - HTTP JSON server (storefront, seller and admin surfaces)
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Coupon evaluation, order status transitions and review
//! rating aggregation all live here so they can be tested in isolation.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, timestamps, emails, locales and statuses
//! - [`models`] - Marketplace entities as stored in the document store
//! - [`forms`] - Validation of client input into domain values

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod forms;
pub mod models;
pub mod types;

pub use models::{Coupon, Order, Product, Review, Store, User, WishlistItem};
pub use types::*;
