//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use souq_core::{Store, StoreId};

use crate::config::ApiConfig;
use crate::db::DocumentStore;

/// How long a store document stays cached.
const STORE_CACHE_TTL: Duration = Duration::from_secs(60);
const STORE_CACHE_CAPACITY: u64 = 10_000;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// document store, the configuration and the store cache.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    documents: Arc<dyn DocumentStore>,
    stores: Cache<StoreId, Store>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ApiConfig, documents: Arc<dyn DocumentStore>) -> Self {
        let stores = Cache::builder()
            .max_capacity(STORE_CACHE_CAPACITY)
            .time_to_live(STORE_CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                documents,
                stores,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the document store.
    #[must_use]
    pub fn documents(&self) -> &dyn DocumentStore {
        self.inner.documents.as_ref()
    }

    /// A shared handle to the document store.
    #[must_use]
    pub fn documents_handle(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.inner.documents)
    }

    /// Read-through cache of store documents.
    #[must_use]
    pub fn store_cache(&self) -> &Cache<StoreId, Store> {
        &self.inner.stores
    }
}
