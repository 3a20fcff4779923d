//! Authentication service.
//!
//! Password accounts with argon2 hashes. Session handling lives in
//! [`crate::middleware::auth`]; this service only proves who the caller is.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use souq_core::forms::account::{Credentials, Registration};
use souq_core::{Timestamp, User, UserId};

use crate::db::{DocumentStore, RepositoryError, UserRepository};

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            users: UserRepository::new(store),
        }
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::EmailTaken` if the email is already registered.
    /// Returns `AuthError::PasswordHash` if hashing fails.
    pub async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        if self.users.get_by_email(&registration.email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash_password(&registration.password)?;
        let now = Timestamp::now();
        let user = User {
            id: UserId::generate(),
            email: registration.email,
            name: registration.name,
            phone: registration.phone,
            role: registration.role,
            preferred_locale: registration.preferred_locale.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        self.users
            .create(&user, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })
    }

    /// Check an email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email or a wrong
    /// password.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, AuthError> {
        let Some((user, hash)) = self.users.credentials(&credentials.email).await? else {
            // Burn comparable time so unknown emails are not distinguishable.
            let _ = hash_password(&credentials.password);
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(&credentials.password, &hash)?;
        Ok(user)
    }
}

/// Hash a password with argon2id and a random salt.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
