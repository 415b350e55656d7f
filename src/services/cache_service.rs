//! Cache gateway
//!
//! Thin wrapper over Redis. Errors are returned to the caller, which is
//! expected to log them and carry on without the cache. The connection is
//! opened on first use, so a cache that is down at startup only costs latency.

use std::time::Duration;

use async_trait::async_trait;
use redis::{
    AsyncCommands, IntoConnectionInfo,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tokio::sync::OnceCell;
use tracing::info;

use crate::constants::{CACHE_CONNECT_RETRIES, CACHE_CONNECT_TIMEOUT_MS, CACHE_SCAN_BATCH};

/// Cache failures
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Timed out connecting to Redis")]
    ConnectTimeout,
}

/// Key-value operations used by the contest listing cache
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_seconds: u64)
    -> Result<(), CacheError>;

    /// Every key matching a glob pattern such as `contests:*`
    async fn find_keys(&self, pattern: &str) -> Result<Vec<String>, CacheError>;

    async fn delete_many(&self, keys: &[String]) -> Result<(), CacheError>;
}

/// Redis-backed cache
pub struct RedisCache {
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
}

impl RedisCache {
    /// Validate the connection target without dialling it
    pub fn new(info: impl IntoConnectionInfo) -> Result<Self, CacheError> {
        Ok(Self {
            client: redis::Client::open(info)?,
            conn: OnceCell::new(),
        })
    }

    /// Managed connection, opened on first call.
    ///
    /// A failed attempt leaves the cell empty so the next call retries; once
    /// open, reconnects are handled by the manager.
    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let config = ConnectionManagerConfig::new().set_number_of_retries(CACHE_CONNECT_RETRIES);
                let connect = ConnectionManager::new_with_config(self.client.clone(), config);

                let conn = tokio::time::timeout(Duration::from_millis(CACHE_CONNECT_TIMEOUT_MS), connect)
                    .await
                    .map_err(|_| CacheError::ConnectTimeout)??;

                info!("Connected to Redis");
                Ok::<_, CacheError>(conn)
            })
            .await?;

        Ok(conn.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.conn.initialized()
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await?;
        Ok(())
    }

    async fn find_keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.connection().await?;
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        // SCAN instead of KEYS so a large keyspace never blocks the server
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(CACHE_SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut conn = self.connection().await?;
        conn.del::<_, ()>(keys.to_vec()).await?;
        Ok(())
    }
}
