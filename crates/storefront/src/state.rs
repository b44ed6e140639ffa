//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::store::{CartRepository, FulfillmentStore, PgStore};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Handlers reach storage only
/// through the store traits, so the same router runs over `PostgreSQL` in
/// production and over [`crate::store::MemoryStore`] in tests.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    fulfillment: Arc<dyn FulfillmentStore>,
    carts: Arc<dyn CartRepository>,
}

impl AppState {
    /// Create application state backed by `PostgreSQL`.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self::with_stores(config, store.clone(), store)
    }

    /// Create application state over arbitrary stores.
    #[must_use]
    pub fn with_stores(
        config: StorefrontConfig,
        fulfillment: Arc<dyn FulfillmentStore>,
        carts: Arc<dyn CartRepository>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                fulfillment,
                carts,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Ledger, order and catalog store.
    #[must_use]
    pub fn fulfillment(&self) -> &dyn FulfillmentStore {
        self.inner.fulfillment.as_ref()
    }

    /// Server cart store.
    #[must_use]
    pub fn carts(&self) -> &dyn CartRepository {
        self.inner.carts.as_ref()
    }
}
