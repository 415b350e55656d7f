//! Test utilities
//!
//! In-memory implementations of the store, cache and publisher seams, plus
//! lazily started containers for the tests that need the real services.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicI64, Ordering},
    },
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, TimeZone, Utc};
use tower::ServiceExt;

use crate::{
    db::repositories::{ContestRepository, ContestStore, Statement},
    models::{Contest, ContestFilter, NewContest},
    services::{CacheError, CacheStore, EventPublisher, JwtManager, PublishError},
    state::AppState,
};

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_only";

pub mod containers {
    use std::sync::OnceLock;
    use testcontainers::{ContainerAsync, runners::AsyncRunner};
    use testcontainers_modules::{postgres::Postgres, redis::Redis};

    static POSTGRES: OnceLock<ContainerAsync<Postgres>> = OnceLock::new();
    static REDIS: OnceLock<ContainerAsync<Redis>> = OnceLock::new();

    /// Get or start a PostgreSQL container (lazy initialization)
    pub async fn get_postgres() -> &'static ContainerAsync<Postgres> {
        if POSTGRES.get().is_none() {
            let container = Postgres::default()
                .with_user("rumble")
                .with_password("rumble_test")
                .with_db_name("rumble_test")
                .start()
                .await
                .expect("Failed to start PostgreSQL container");

            let _ = POSTGRES.set(container);
        }
        POSTGRES.get().unwrap()
    }

    /// Get or start a Redis container (lazy initialization)
    pub async fn get_redis() -> &'static ContainerAsync<Redis> {
        if REDIS.get().is_none() {
            let container = Redis::default()
                .start()
                .await
                .expect("Failed to start Redis container");

            let _ = REDIS.set(container);
        }
        REDIS.get().unwrap()
    }

    pub async fn postgres_url() -> String {
        let container = get_postgres().await;
        let host = container.get_host().await.unwrap();
        let port = container.get_host_port_ipv4(5432).await.unwrap();
        format!("postgres://rumble:rumble_test@{}:{}/rumble_test", host, port)
    }

    pub async fn redis_url() -> String {
        let container = get_redis().await;
        let host = container.get_host().await.unwrap();
        let port = container.get_host_port_ipv4(6379).await.unwrap();
        format!("redis://{}:{}", host, port)
    }
}

/// Contest `id` starting `id` days after 2030-01-01
pub fn contest_fixture(id: i64) -> Contest {
    Contest {
        id,
        sport: "football".to_string(),
        entry_fee: 10.0,
        prize_pool: 0.0,
        participants: 0,
        starts_at: Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap() + Duration::days(id),
        max_players: 10,
    }
}

/// Contest store over a vector, recording the statements it would have run
#[derive(Default)]
pub struct InMemoryStore {
    rows: Mutex<Vec<Contest>>,
    statements: Mutex<Vec<Statement>>,
    next_id: AtomicI64,
    failing: AtomicBool,
}

impl InMemoryStore {
    pub fn with_rows(rows: Vec<Contest>) -> Self {
        let next_id = rows.iter().map(|c| c.id).max().unwrap_or(0);
        Self {
            rows: Mutex::new(rows),
            next_id: AtomicI64::new(next_id),
            ..Default::default()
        }
    }

    /// Every later call fails as if the pool were exhausted
    pub fn fail_with_connection_error(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<Contest> {
        self.rows.lock().unwrap().clone()
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.statements.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), sqlx::Error> {
        if self.failing.load(Ordering::SeqCst) {
            Err(sqlx::Error::PoolTimedOut)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ContestStore for InMemoryStore {
    async fn insert(&self, contest: &NewContest) -> Result<Contest, sqlx::Error> {
        self.check()?;
        self.statements
            .lock()
            .unwrap()
            .push(ContestRepository::insert_statement(contest));

        let row = Contest {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            sport: contest.sport.clone(),
            entry_fee: contest.entry_fee,
            prize_pool: 0.0,
            participants: 0,
            starts_at: contest.starts_at,
            max_players: contest.max_players,
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn list(&self, filter: &ContestFilter) -> Result<(Vec<Contest>, i64), sqlx::Error> {
        self.check()?;
        {
            let mut statements = self.statements.lock().unwrap();
            statements.push(ContestRepository::count_statement(filter));
            statements.push(ContestRepository::page_statement(filter));
        }

        let mut matching: Vec<Contest> = self
            .rows()
            .into_iter()
            .filter(|c| filter.sport.as_ref().is_none_or(|s| &c.sport == s))
            .filter(|c| filter.min_fee.is_none_or(|min| c.entry_fee >= min))
            .filter(|c| filter.max_fee.is_none_or(|max| c.entry_fee <= max))
            .collect();
        matching.sort_by(|a, b| b.starts_at.cmp(&a.starts_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }
}

fn cache_down() -> CacheError {
    CacheError::Redis(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "cache unavailable",
    )))
}

/// Cache over a map of key to (value, ttl)
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, (String, Option<u64>)>>,
    failing_reads: AtomicBool,
}

impl InMemoryCache {
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), None));
    }

    pub fn fail_reads(&self) {
        self.failing_reads.store(true, Ordering::SeqCst);
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn value_of(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).map(|(v, _)| v.clone())
    }

    pub fn ttl_of(&self, key: &str) -> Option<u64> {
        self.entries.lock().unwrap().get(key).and_then(|(_, ttl)| *ttl)
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(cache_down());
        }
        Ok(self.value_of(key))
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<(), CacheError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), Some(ttl_seconds)));
        Ok(())
    }

    async fn find_keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let keys = self.keys();
        Ok(match pattern.strip_suffix('*') {
            Some(prefix) => keys.into_iter().filter(|k| k.starts_with(prefix)).collect(),
            None => keys.into_iter().filter(|k| k == pattern).collect(),
        })
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().unwrap();
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub exchange: String,
    pub routing_key: String,
    pub payload: Vec<u8>,
}

/// Publisher that keeps every message it is handed
#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<PublishedMessage>>,
}

impl RecordingPublisher {
    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &[u8],
    ) -> Result<(), PublishError> {
        self.messages.lock().unwrap().push(PublishedMessage {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }
}

pub fn test_jwt() -> JwtManager {
    JwtManager::new(TEST_JWT_SECRET, 24)
}

pub fn state_with(
    store: Arc<dyn ContestStore>,
    cache: Arc<dyn CacheStore>,
    events: Arc<dyn EventPublisher>,
) -> AppState {
    AppState::new(store, cache, events, test_jwt())
}

/// Signed bearer token for a caller with the given role
pub fn token_for(role: Option<&str>) -> String {
    test_jwt().issue("0xabc", role).unwrap()
}

/// Drive one request through the full application router
pub async fn send(state: AppState, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let app: Router = crate::app(state);
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
