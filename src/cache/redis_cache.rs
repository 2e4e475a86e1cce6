// Copyright (c) 2025 - Cowboy AI, Inc.
//! Redis-backed cache
//!
//! Values are stored with `SET key value EX ttl`; Redis expires them on its
//! own. Sub-second TTLs round up to one second, and TTLs longer than Redis
//! can represent are stored without expiry. Clones share one
//! `ConnectionManager`, which reconnects transparently after a Redis restart.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::{debug, info};

use super::{CacheError, CacheResult, CacheStore};
use crate::config::CacheConfig;

/// Redis [`CacheStore`]
#[derive(Clone)]
pub struct RedisCache {
    conn_manager: ConnectionManager,
    default_ttl: Duration,
}

impl RedisCache {
    /// Connect to the Redis instance described by `config`
    ///
    /// # Errors
    ///
    /// `CacheError::Connection` if the URL is malformed or the server
    /// cannot be reached.
    pub async fn connect(config: &CacheConfig) -> CacheResult<Self> {
        let url = config.url();
        let client = Client::open(url.as_str())
            .map_err(|e| CacheError::Connection(format!("invalid Redis URL {url}: {e}")))?;

        let conn_manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        info!(url = %url, default_ttl_secs = config.default_ttl.as_secs(), "Redis cache connected");

        Ok(Self {
            conn_manager,
            default_ttl: config.default_ttl,
        })
    }
}

/// Longest `EX` accepted: Redis converts it to milliseconds and adds the
/// current time, both as signed 64-bit values
const MAX_EXPIRE_SECONDS: u64 = (i64::MAX / 1000 / 2) as u64;

/// Whole seconds for `SET EX`, or `None` for no expiry
fn ttl_seconds(ttl: Duration) -> Option<u64> {
    let seconds = ttl.as_secs();
    let seconds = if ttl.subsec_nanos() > 0 {
        seconds.saturating_add(1)
    } else {
        seconds
    };
    (seconds <= MAX_EXPIRE_SECONDS).then_some(seconds)
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
            CacheError::Connection(err.to_string())
        } else {
            CacheError::Backend(err.to_string())
        }
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.conn_manager.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        debug!(key, hit = value.is_some(), "Cache lookup");
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        if ttl.is_zero() {
            return self.invalidate(key).await;
        }

        let mut conn = self.conn_manager.clone();
        match ttl_seconds(ttl) {
            Some(seconds) => {
                let _: () = conn.set_ex(key, value, seconds).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn_manager.clone();
        let _: () = conn.del(key).await?;
        debug!(key, "Cache entry invalidated");
        Ok(())
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}
