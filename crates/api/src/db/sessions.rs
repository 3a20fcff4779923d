//! `tower-sessions` store over the document store.
//!
//! Each session is a document in the `sessions` collection holding the
//! serialized record and its expiry as a unix timestamp. Expired records
//! are treated as missing and deleted on load.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tower_sessions::SessionStore;
use tower_sessions::cookie::time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store;

use super::document::{Document, Patch, collections};
use super::{DocumentStore, StoreError};

/// Session records persisted through a [`DocumentStore`].
#[derive(Clone)]
pub struct DocumentSessionStore {
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for DocumentSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSessionStore").finish_non_exhaustive()
    }
}

impl DocumentSessionStore {
    /// Wrap a document store.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn to_document(record: &Record) -> session_store::Result<Document> {
        let encoded =
            serde_json::to_value(record).map_err(|e| session_store::Error::Encode(e.to_string()))?;
        Document::from_value(json!({
            "id": record.id.to_string(),
            "record": encoded,
            "expiresAt": record.expiry_date.unix_timestamp(),
        }))
        .map_err(backend)
    }
}

fn backend(err: StoreError) -> session_store::Error {
    session_store::Error::Backend(err.to_string())
}

#[async_trait]
impl SessionStore for DocumentSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        loop {
            match self
                .store
                .insert(collections::SESSIONS, Self::to_document(record)?)
                .await
            {
                Ok(_) => return Ok(()),
                // Id collision: draw a new one.
                Err(StoreError::Conflict { .. }) => record.id = Id::default(),
                Err(e) => return Err(backend(e)),
            }
        }
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let document = Self::to_document(record)?;
        let id = document.id().to_string();
        let patch: Patch = document.fields().clone();
        let updated = self
            .store
            .update(collections::SESSIONS, &id, patch)
            .await
            .map_err(backend)?;
        if updated.is_none() {
            self.store
                .insert(collections::SESSIONS, document)
                .await
                .map_err(backend)?;
        }
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let id = session_id.to_string();
        let Some(document) = self
            .store
            .get(collections::SESSIONS, &id)
            .await
            .map_err(backend)?
        else {
            return Ok(None);
        };

        let expires_at = document
            .get("expiresAt")
            .and_then(Value::as_i64)
            .unwrap_or_default();
        if expires_at <= OffsetDateTime::now_utc().unix_timestamp() {
            self.store
                .delete(collections::SESSIONS, &id)
                .await
                .map_err(backend)?;
            return Ok(None);
        }

        let record = document
            .get("record")
            .cloned()
            .ok_or_else(|| session_store::Error::Decode("session has no record".to_string()))?;
        serde_json::from_value(record)
            .map(Some)
            .map_err(|e| session_store::Error::Decode(e.to_string()))
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.store
            .delete(collections::SESSIONS, &session_id.to_string())
            .await
            .map_err(backend)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use tower_sessions::cookie::time::Duration;

    use super::*;
    use crate::db::MemoryDocumentStore;

    fn record(expires_in: Duration) -> Record {
        let mut data = HashMap::new();
        data.insert("user".to_string(), json!({"id": "u1"}));
        Record {
            id: Id::default(),
            data,
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    #[tokio::test]
    async fn test_create_load_delete() {
        let store = DocumentSessionStore::new(Arc::new(MemoryDocumentStore::new()));
        let mut rec = record(Duration::hours(1));
        store.create(&mut rec).await.unwrap();

        let loaded = store.load(&rec.id).await.unwrap().unwrap();
        assert_eq!(loaded.data.get("user"), Some(&json!({"id": "u1"})));

        store.delete(&rec.id).await.unwrap();
        assert!(store.load(&rec.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = DocumentSessionStore::new(Arc::new(MemoryDocumentStore::new()));
        let mut rec = record(Duration::hours(1));
        store.save(&rec).await.unwrap();

        rec.data.insert("locale".to_string(), json!("en"));
        store.save(&rec).await.unwrap();
        let loaded = store.load(&rec.id).await.unwrap().unwrap();
        assert_eq!(loaded.data.len(), 2);
    }

    #[tokio::test]
    async fn test_expired_is_missing() {
        let docs: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let store = DocumentSessionStore::new(Arc::clone(&docs));
        let mut rec = record(Duration::seconds(-5));
        store.create(&mut rec).await.unwrap();

        assert!(store.load(&rec.id).await.unwrap().is_none());
        assert!(
            docs.get(collections::SESSIONS, &rec.id.to_string())
                .await
                .unwrap()
                .is_none()
        );
    }
}
