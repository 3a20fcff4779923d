//! Core types for Souq.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod locale;
pub mod money;
pub mod status;
pub mod timestamp;

pub use email::{Email, EmailError};
pub use id::*;
pub use locale::{Locale, LocalizedText};
pub use money::{CurrencyCode, Money};
pub use status::*;
pub use timestamp::Timestamp;
