//! Contest service
//!
//! Orchestrates the relational store, the listing cache and the event
//! publisher. The store is the source of truth: cache and broker failures are
//! logged and never change the outcome of a request.

use tracing::{debug, error, info, warn};

use crate::{
    constants::{
        CONTEST_CACHE_PATTERN, CONTEST_CACHE_TTL_SECS, CONTEST_EVENTS_EXCHANGE,
        CONTEST_EVENTS_ROUTING_KEY,
    },
    error::AppResult,
    models::{Contest, ContestEvent, ContestFilter, ContestPage, NewContest},
    state::AppState,
};

/// Contest service for business logic
pub struct ContestService;

impl ContestService {
    /// Insert a contest, announce it, then purge every cached listing
    pub async fn create_contest(state: &AppState, contest: NewContest) -> AppResult<Contest> {
        let created = state.store().insert(&contest).await?;

        info!(
            contest_id = created.id,
            sport = %created.sport,
            starts_at = %created.starts_at,
            "Contest created"
        );

        Self::publish_event(state, ContestEvent::ContestCreated(created.clone())).await;
        Self::invalidate_listings(state).await;

        Ok(created)
    }

    /// One page of contests, served from cache when possible
    pub async fn list_contests(state: &AppState, filter: ContestFilter) -> AppResult<ContestPage> {
        let cache_key = match filter.cache_key() {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(error = %e, "Could not derive cache key, bypassing cache");
                None
            }
        };

        if let Some(key) = &cache_key {
            if let Some(page) = Self::read_cached(state, key).await {
                return Ok(page);
            }
        }

        let (contests, total) = state.store().list(&filter).await?;
        let page = ContestPage::new(contests, total, &filter);

        if let Some(key) = &cache_key {
            Self::write_cached(state, key, &page).await;
        }

        Ok(page)
    }

    /// Delete every cached list page
    pub async fn invalidate_listings(state: &AppState) {
        let keys = match state.cache().find_keys(CONTEST_CACHE_PATTERN).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Failed to enumerate cached contest pages");
                return;
            }
        };

        if keys.is_empty() {
            return;
        }

        match state.cache().delete_many(&keys).await {
            Ok(()) => debug!(count = keys.len(), "Invalidated cached contest pages"),
            Err(e) => warn!(error = %e, count = keys.len(), "Failed to invalidate cached contest pages"),
        }
    }

    async fn publish_event(state: &AppState, event: ContestEvent) {
        let payload = match event.to_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, event = event.name(), "Failed to encode event");
                return;
            }
        };

        if let Err(e) = state
            .events()
            .publish(CONTEST_EVENTS_EXCHANGE, CONTEST_EVENTS_ROUTING_KEY, &payload)
            .await
        {
            error!(error = %e, event = event.name(), "Failed to publish event");
        }
    }

    async fn read_cached(state: &AppState, key: &str) -> Option<ContestPage> {
        match state.cache().get(key).await {
            Ok(Some(text)) => match serde_json::from_str::<ContestPage>(&text) {
                Ok(page) => {
                    debug!(key = %key, "Contest list cache hit");
                    Some(page)
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Discarding unreadable cached page");
                    None
                }
            },
            Ok(None) => {
                debug!(key = %key, "Contest list cache miss");
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, falling back to database");
                None
            }
        }
    }

    async fn write_cached(state: &AppState, key: &str, page: &ContestPage) {
        let text = match serde_json::to_string(page) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to serialize contest page for cache");
                return;
            }
        };

        if let Err(e) = state
            .cache()
            .set_with_ttl(key, &text, CONTEST_CACHE_TTL_SECS)
            .await
        {
            warn!(key = %key, error = %e, "Cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        db::repositories::{ContestRepository, SqlParam},
        services::{
            cache_service::{CacheError, MockCacheStore},
            event_service::{MockEventPublisher, PublishError},
        },
        test_utils::{InMemoryCache, InMemoryStore, RecordingPublisher, contest_fixture, state_with},
    };

    fn redis_down() -> CacheError {
        CacheError::Redis(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "connection refused",
        )))
    }

    fn new_contest() -> NewContest {
        NewContest {
            sport: "tennis".to_string(),
            entry_fee: 15.0,
            starts_at: Utc.with_ymd_and_hms(2030, 5, 1, 18, 0, 0).unwrap(),
            max_players: 4,
        }
    }

    #[tokio::test]
    async fn test_create_inserts_publishes_and_purges() {
        let store = Arc::new(InMemoryStore::default());
        let cache = Arc::new(InMemoryCache::default());
        let events = Arc::new(RecordingPublisher::default());
        cache.insert_raw("contests:{\"page\":1}", "{}");
        cache.insert_raw("contests:{\"page\":2}", "{}");
        cache.insert_raw("auth:nonce:0x1", "nonce");
        let state = state_with(store.clone(), cache.clone(), events.clone());

        let created = ContestService::create_contest(&state, new_contest()).await.unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(store.statements().len(), 1);

        let published = events.messages();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].exchange, "contest.events");
        assert_eq!(published[0].routing_key, "");
        let envelope: serde_json::Value = serde_json::from_slice(&published[0].payload).unwrap();
        assert_eq!(envelope["type"], "ContestCreated");
        assert_eq!(envelope["data"], serde_json::to_value(&created).unwrap());

        assert_eq!(cache.keys(), vec!["auth:nonce:0x1".to_string()]);
    }

    #[tokio::test]
    async fn test_create_survives_publish_failure() {
        let store = Arc::new(InMemoryStore::default());
        let cache = Arc::new(InMemoryCache::default());
        cache.insert_raw("contests:{}", "{}");

        let mut events = MockEventPublisher::new();
        events.expect_publish().times(1).returning(|_, _, _| {
            Err(PublishError::Amqp(lapin::Error::InvalidChannelState(
                lapin::ChannelState::Closed,
            )))
        });
        let state = state_with(store.clone(), cache.clone(), Arc::new(events));

        let created = ContestService::create_contest(&state, new_contest()).await;

        assert!(created.is_ok());
        assert_eq!(store.rows().len(), 1);
        assert!(cache.keys().is_empty());
    }

    #[tokio::test]
    async fn test_create_survives_invalidation_failure() {
        let store = Arc::new(InMemoryStore::default());
        let events = Arc::new(RecordingPublisher::default());

        let mut cache = MockCacheStore::new();
        cache
            .expect_find_keys()
            .withf(|pattern| pattern.to_string() == "contests:*")
            .times(1)
            .returning(|_| Err(redis_down()));
        cache.expect_delete_many().never();
        let state = state_with(store.clone(), Arc::new(cache), events.clone());

        assert!(ContestService::create_contest(&state, new_contest()).await.is_ok());
        assert_eq!(events.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_produces_no_event() {
        let store = Arc::new(InMemoryStore::default());
        store.fail_with_connection_error();
        let events = Arc::new(RecordingPublisher::default());
        let state = state_with(store.clone(), Arc::new(InMemoryCache::default()), events.clone());

        let result = ContestService::create_contest(&state, new_contest()).await;

        assert!(result.is_err());
        assert!(store.rows().is_empty());
        assert!(events.messages().is_empty());
    }

    #[tokio::test]
    async fn test_list_miss_queries_store_then_caches() {
        let rows: Vec<Contest> = (1..=25).map(contest_fixture).collect();
        let store = Arc::new(InMemoryStore::with_rows(rows));
        let cache = Arc::new(InMemoryCache::default());
        let state = state_with(
            store.clone(),
            cache.clone(),
            Arc::new(RecordingPublisher::default()),
        );
        let filter = ContestFilter {
            page: 2,
            limit: 10,
            ..Default::default()
        };

        let page = ContestService::list_contests(&state, filter.clone()).await.unwrap();

        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.contests.len(), 10);

        let statements = store.statements();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0], ContestRepository::count_statement(&filter));
        assert_eq!(
            statements[1].params,
            vec![SqlParam::BigInt(10), SqlParam::BigInt(10)]
        );

        let key = filter.cache_key().unwrap();
        assert_eq!(cache.ttl_of(&key), Some(30));
        let cached: ContestPage = serde_json::from_str(&cache.value_of(&key).unwrap()).unwrap();
        assert_eq!(cached, page);
    }

    #[tokio::test]
    async fn test_list_hit_skips_store() {
        let store = Arc::new(InMemoryStore::default());
        let cache = Arc::new(InMemoryCache::default());
        let filter = ContestFilter::default();
        let cached = ContestPage::new(vec![contest_fixture(3)], 41, &filter);
        cache.insert_raw(
            &filter.cache_key().unwrap(),
            &serde_json::to_string(&cached).unwrap(),
        );
        let state = state_with(
            store.clone(),
            cache.clone(),
            Arc::new(RecordingPublisher::default()),
        );

        let page = ContestService::list_contests(&state, filter).await.unwrap();

        assert_eq!(page, cached);
        assert!(store.statements().is_empty());
    }

    #[tokio::test]
    async fn test_list_falls_through_when_cache_is_down() {
        let store = Arc::new(InMemoryStore::with_rows(vec![contest_fixture(1)]));

        let mut cache = MockCacheStore::new();
        cache.expect_get().times(1).returning(|_| Err(redis_down()));
        cache
            .expect_set_with_ttl()
            .times(1)
            .returning(|_, _, _| Err(redis_down()));
        let state = state_with(
            store.clone(),
            Arc::new(cache),
            Arc::new(RecordingPublisher::default()),
        );

        let page = ContestService::list_contests(&state, ContestFilter::default())
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(store.statements().len(), 2);
    }

    #[tokio::test]
    async fn test_list_ignores_corrupt_cache_entry() {
        let store = Arc::new(InMemoryStore::with_rows(vec![contest_fixture(1)]));
        let cache = Arc::new(InMemoryCache::default());
        let filter = ContestFilter::default();
        cache.insert_raw(&filter.cache_key().unwrap(), "not json");
        let state = state_with(
            store.clone(),
            cache.clone(),
            Arc::new(RecordingPublisher::default()),
        );

        let page = ContestService::list_contests(&state, filter.clone()).await.unwrap();

        assert_eq!(page.contests.len(), 1);
        assert_ne!(cache.value_of(&filter.cache_key().unwrap()).unwrap(), "not json");
    }
}
