//! Account domain type.

use serde::{Deserialize, Serialize};

use crate::types::{Email, Locale, Timestamp, UserId, UserRole};

/// A marketplace account.
///
/// The stored document also carries a `passwordHash` field, which is read
/// separately by the account repository and never deserialized into this
/// type, so it cannot leak into API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: UserRole,
    #[serde(default)]
    pub preferred_locale: Locale,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// Whether this account is an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
