//! Application state management
//!
//! This module contains the shared application state that is passed
//! to all request handlers via Axum's State extractor.

use std::sync::Arc;

use crate::{
    db::repositories::ContestStore,
    services::{CacheStore, EventPublisher, JwtManager},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

/// Inner state (wrapped in Arc for cheap cloning)
struct AppStateInner {
    /// Relational store, the source of truth for contests
    store: Arc<dyn ContestStore>,

    /// Listing cache
    cache: Arc<dyn CacheStore>,

    /// Domain event sink
    events: Arc<dyn EventPublisher>,

    /// Bearer token verification
    jwt: JwtManager,
}

impl AppState {
    /// Create a new application state
    pub fn new(
        store: Arc<dyn ContestStore>,
        cache: Arc<dyn CacheStore>,
        events: Arc<dyn EventPublisher>,
        jwt: JwtManager,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                cache,
                events,
                jwt,
            }),
        }
    }

    pub fn store(&self) -> &dyn ContestStore {
        self.inner.store.as_ref()
    }

    pub fn cache(&self) -> &dyn CacheStore {
        self.inner.cache.as_ref()
    }

    pub fn events(&self) -> &dyn EventPublisher {
        self.inner.events.as_ref()
    }

    pub fn jwt(&self) -> &JwtManager {
        &self.inner.jwt
    }
}
