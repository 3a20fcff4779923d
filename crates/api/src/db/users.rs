//! Account repository.
//!
//! The stored user document is the serialized [`User`] plus a
//! `passwordHash` field holding the argon2 PHC string. Only
//! [`UserRepository::credentials`] reads the hash back out.

use serde_json::Value;

use souq_core::forms::account::ProfileChanges;
use souq_core::{Email, User, UserId, UserRole};

use super::document::{Document, Filter, FilterOp, Query, collections, patch_from};
use super::{DocumentStore, RepositoryError, decode, decode_opt, touch};

const PASSWORD_HASH: &str = "passwordHash";

/// Repository for account documents.
pub struct UserRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the lookup fails.
    /// Returns `RepositoryError::DataCorruption` if the document does not decode.
    pub async fn get(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let document = self.store.get(collections::USERS, id.as_str()).await?;
        decode_opt(collections::USERS, document)
    }

    /// Get a user by their (normalized) email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the document does not decode.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self.find_by_email(email).await?.map(|(user, _)| user))
    }

    /// A user together with their stored password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the document lacks a hash.
    pub async fn credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        match self.find_by_email(email).await? {
            Some((user, Some(hash))) => Ok(Some((user, hash))),
            Some((user, None)) => Err(RepositoryError::DataCorruption(format!(
                "user {} has no password hash",
                user.id
            ))),
            None => Ok(None),
        }
    }

    async fn find_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, Option<String>)>, RepositoryError> {
        let query = Query::new().eq("email", email.as_str()).limit(1);
        let page = self.store.query(collections::USERS, &query).await?;
        let Some(document) = page.documents.into_iter().next() else {
            return Ok(None);
        };
        let hash = document
            .get(PASSWORD_HASH)
            .and_then(Value::as_str)
            .map(String::from);
        let user = decode(collections::USERS, document)?;
        Ok(Some((user, hash)))
    }

    /// Store a new account with its password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id or email is taken.
    pub async fn create(&self, user: &User, password_hash: &str) -> Result<User, RepositoryError> {
        let mut document = Document::from_entity(user)?;
        document.fields_mut().insert(
            PASSWORD_HASH.to_string(),
            Value::String(password_hash.to_string()),
        );
        let stored = self.store.insert(collections::USERS, document).await?;
        decode(collections::USERS, stored)
    }

    /// Apply profile changes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the update fails.
    pub async fn update_profile(
        &self,
        id: &UserId,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, RepositoryError> {
        let patch = touch(patch_from(changes)?);
        let document = self.store.update(collections::USERS, id.as_str(), patch).await?;
        decode_opt(collections::USERS, document)
    }

    /// Change an account's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the update fails.
    pub async fn set_role(
        &self,
        id: &UserId,
        role: UserRole,
    ) -> Result<Option<User>, RepositoryError> {
        let mut patch = super::Patch::new();
        patch.insert("role".to_string(), Value::String(role.as_str().to_string()));
        let document = self
            .store
            .update(collections::USERS, id.as_str(), touch(patch))
            .await?;
        decode_opt(collections::USERS, document)
    }

    /// Number of accounts, optionally with one role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the count fails.
    pub async fn count(&self, role: Option<UserRole>) -> Result<u64, RepositoryError> {
        let filters: Vec<Filter> = role
            .map(|r| Filter {
                field: "role".to_string(),
                op: FilterOp::Eq,
                value: Value::String(r.as_str().to_string()),
            })
            .into_iter()
            .collect();
        Ok(self.store.count(collections::USERS, &filters).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use souq_core::{Locale, Timestamp};

    use super::*;
    use crate::db::MemoryDocumentStore;

    fn user(id: &str, email: &str) -> User {
        let now = Timestamp::now();
        User {
            id: UserId::new(id),
            email: Email::parse(email).unwrap(),
            name: "Layla".to_string(),
            phone: None,
            role: UserRole::Customer,
            preferred_locale: Locale::Ar,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_hash_stays_out_of_user() {
        let store = MemoryDocumentStore::new();
        let repo = UserRepository::new(&store);
        repo.create(&user("u1", "layla@example.sa"), "$argon2id$hash")
            .await
            .unwrap();

        let email = Email::parse("layla@example.sa").unwrap();
        let (found, hash) = repo.credentials(&email).await.unwrap().unwrap();
        assert_eq!(found.id, UserId::new("u1"));
        assert_eq!(hash, "$argon2id$hash");

        let json = serde_json::to_value(&found).unwrap();
        assert!(json.get(PASSWORD_HASH).is_none());
    }

    #[tokio::test]
    async fn test_set_role_and_count() {
        let store = MemoryDocumentStore::new();
        let repo = UserRepository::new(&store);
        repo.create(&user("u1", "a@example.sa"), "h").await.unwrap();
        repo.create(&user("u2", "b@example.sa"), "h").await.unwrap();

        let promoted = repo
            .set_role(&UserId::new("u2"), UserRole::Seller)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(promoted.role, UserRole::Seller);
        assert_eq!(repo.count(None).await.unwrap(), 2);
        assert_eq!(repo.count(Some(UserRole::Seller)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_conflict() {
        let store = MemoryDocumentStore::new();
        let repo = UserRepository::new(&store);
        repo.create(&user("u1", "a@example.sa"), "h").await.unwrap();
        let err = repo.create(&user("u1", "b@example.sa"), "h").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }
}
