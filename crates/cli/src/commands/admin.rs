//! Account management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a new admin account
//! souq-cli admin create -e admin@example.com -n "Admin Name" -p 'long-password'
//!
//! # Promote an existing account
//! souq-cli admin promote -e seller@example.com -r admin
//! ```
//!
//! # Environment Variables
//!
//! - `SOUQ_DATABASE_URL` - `PostgreSQL` connection string
//! - `SOUQ_ADMIN_PASSWORD` - password for `admin create` when `-p` is omitted
//!
//! Role changes reach existing sessions only after the user logs in again.

use thiserror::Error;

use souq_api::db::{PgDocumentStore, RepositoryError, UserRepository};
use souq_api::services::{AuthError, AuthService};
use souq_core::forms::account::Registration;
use souq_core::{Email, UserId, UserRole};

use super::{ConnectError, connect};

/// Minimum admin password length.
const MIN_PASSWORD: usize = 8;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Could not reach the database.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Repository operation failed.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Registration failed.
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: customer, seller, admin")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Password too short.
    #[error("Password must be at least {MIN_PASSWORD} characters")]
    WeakPassword,

    /// No account with this email.
    #[error("No account with email: {0}")]
    UserNotFound(String),
}

fn parse_email(email: &str) -> Result<Email, AdminError> {
    Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))
}

/// Create a new admin account.
///
/// # Arguments
///
/// * `email` - Account email address
/// * `name` - Display name
/// * `password` - Initial password
///
/// # Returns
///
/// The ID of the created account.
///
/// # Errors
///
/// Returns `AdminError::Auth` if the email is already registered.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<UserId, AdminError> {
    let email = parse_email(email)?;
    if password.chars().count() < MIN_PASSWORD {
        return Err(AdminError::WeakPassword);
    }

    let store = PgDocumentStore::new(connect().await?);

    tracing::info!("Creating admin account: {}", email);
    let user = AuthService::new(&store)
        .register(Registration {
            email,
            password: password.to_owned(),
            name: name.trim().to_owned(),
            phone: None,
            role: UserRole::Admin,
            preferred_locale: None,
        })
        .await?;

    tracing::info!(
        "Admin account created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(user.id)
}

/// Change the role of an existing account.
///
/// # Errors
///
/// Returns `AdminError::UserNotFound` if no account uses `email`.
pub async fn set_role(email: &str, role: &str) -> Result<(), AdminError> {
    let role: UserRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;
    let email = parse_email(email)?;

    let store = PgDocumentStore::new(connect().await?);
    let users = UserRepository::new(&store);

    let user = users
        .get_by_email(&email)
        .await?
        .ok_or_else(|| AdminError::UserNotFound(email.to_string()))?;
    users.set_role(&user.id, role).await?;

    tracing::info!("Role of {} changed from {} to {}", email, user.role, role);
    tracing::warn!("Existing sessions keep the old role until the user logs in again");
    Ok(())
}
