//! In-process document store.
//!
//! Holds every collection in a `BTreeMap` behind a tokio `RwLock`. Used by
//! the integration tests and for running the API without a database
//! (`SOUQ_STORE=memory`). Nothing is persisted.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::{Number, Value};
use tokio::sync::RwLock;

use super::document::{Document, Filter, Page, Patch, Query, check_field};
use super::{DocumentStore, StoreError};

type Collection = BTreeMap<String, Document>;

/// A [`DocumentStore`] backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryDocumentStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `change` to one document under the write lock.
    async fn modify<F>(&self, collection: &str, id: &str, change: F) -> Result<Option<Document>, StoreError>
    where
        F: FnOnce(&mut Document) -> Result<(), StoreError> + Send,
    {
        let mut collections = self.collections.write().await;
        let Some(document) = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
        else {
            return Ok(None);
        };

        let mut updated = document.clone();
        change(&mut updated)?;
        updated
            .fields_mut()
            .insert("id".to_string(), Value::String(id.to_string()));
        *document = updated.clone();
        Ok(Some(updated))
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<Document, StoreError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        let id = document.id().to_string();
        if docs.contains_key(&id) {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                id,
            });
        }
        docs.insert(id, document.clone());
        Ok(document)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Patch,
    ) -> Result<Option<Document>, StoreError> {
        self.modify(collection, id, move |document| {
            let fields = document.fields_mut();
            for (key, value) in patch {
                fields.insert(key, value);
            }
            Ok(())
        })
        .await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(collection)
            .is_some_and(|docs| docs.remove(id).is_some()))
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Page, StoreError> {
        query.validate()?;
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Page {
                documents: Vec::new(),
                next_cursor: None,
            });
        };

        let mut matches: Vec<&Document> = docs
            .values()
            .filter(|doc| query.matches(doc) && query.is_past_cursor(doc))
            .collect();
        matches.sort_by(|a, b| query.compare(a, b));
        matches.truncate(query.limit + 1);

        Ok(Page::from_overfetch(
            matches.into_iter().cloned().collect(),
            query,
        ))
    }

    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64, StoreError> {
        for filter in filters {
            check_field(&filter.field)?;
        }
        let collections = self.collections.read().await;
        let count = collections.get(collection).map_or(0, |docs| {
            docs.values()
                .filter(|doc| filters.iter().all(|f| f.matches(doc)))
                .count()
        });
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<Option<Document>, StoreError> {
        check_field(field)?;
        let name = field.to_string();
        self.modify(collection, id, move |document| {
            let current = match document.get(&name) {
                None | Some(Value::Null) => Value::from(0),
                Some(value) => value.clone(),
            };
            let next = add_to_number(&current, delta).ok_or_else(|| StoreError::NotNumeric(name.clone()))?;
            document.fields_mut().insert(name, next);
            Ok(())
        })
        .await
    }

    async fn push(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<Option<Document>, StoreError> {
        check_field(field)?;
        let name = field.to_string();
        self.modify(collection, id, move |document| {
            let next = match document.fields_mut().remove(&name) {
                None => vec![value],
                Some(Value::Array(mut items)) => {
                    items.push(value);
                    items
                }
                // Mirrors jsonb `||`: a scalar or object becomes the first element.
                Some(other) => vec![other, value],
            };
            document.fields_mut().insert(name, Value::Array(next));
            Ok(())
        })
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

fn add_to_number(current: &Value, delta: i64) -> Option<Value> {
    let Value::Number(n) = current else {
        return None;
    };
    if let Some(sum) = n.as_i64().and_then(|v| v.checked_add(delta)) {
        return Some(Value::from(sum));
    }
    #[allow(clippy::cast_precision_loss)] // counters stay far below 2^53
    let sum = n.as_f64()? + delta as f64;
    Number::from_f64(sum).map(Value::Number)
}
