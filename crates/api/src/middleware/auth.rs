//! Authentication extractors backed by the session.
//!
//! Login stores a [`CurrentUser`] snapshot in the session. Handlers ask for
//! the level of access they need:
//!
//! - [`RequireUser`] - any logged-in account
//! - [`RequireSeller`] - sellers and admins
//! - [`RequireAdmin`] - admins only
//! - [`OptionalUser`] - never rejects
//!
//! Rejections are [`AppError`]s, so they render as the usual error envelope.

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use souq_core::{Email, User, UserId, UserRole};

use crate::error::AppError;

/// Session keys.
pub mod session_keys {
    /// The logged-in account snapshot.
    pub const CURRENT_USER: &str = "current_user";
}

/// The logged-in account, as stored in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub role: UserRole,
}

impl CurrentUser {
    /// Whether the account is an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

async fn session_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Extractor that requires a logged-in account.
///
/// ```rust,ignore
/// async fn handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("مرحبا {}", user.name)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts)
            .await
            .map(Self)
            .ok_or(AppError::Unauthorized)
    }
}

/// Extractor that optionally gets the logged-in account.
pub struct OptionalUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await))
    }
}

/// Extractor that requires a seller or admin account.
pub struct RequireSeller(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireSeller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;
        if user.role.can_sell() {
            Ok(Self(user))
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Extractor that requires an admin account.
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;
        if user.is_admin() {
            Ok(Self(user))
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Store the logged-in account in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Remove the logged-in account from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use souq_core::{Locale, Timestamp};

    use super::*;

    #[test]
    fn test_snapshot_from_user() {
        let now = Timestamp::now();
        let user = User {
            id: UserId::new("u1"),
            email: Email::parse("huda@example.sa").unwrap(),
            name: "Huda".to_string(),
            phone: None,
            role: UserRole::Seller,
            preferred_locale: Locale::Ar,
            created_at: now,
            updated_at: now,
        };
        let current = CurrentUser::from(&user);
        assert_eq!(current.id, user.id);
        assert!(current.role.can_sell());
        assert!(!current.is_admin());
    }

    #[test]
    fn test_snapshot_serde() {
        let current = CurrentUser {
            id: UserId::new("u1"),
            email: Email::parse("a@b.sa").unwrap(),
            name: "A".to_string(),
            role: UserRole::Admin,
        };
        let json = serde_json::to_value(&current).unwrap();
        assert_eq!(json["role"], "admin");
        let back: CurrentUser = serde_json::from_value(json).unwrap();
        assert_eq!(back, current);
    }
}
