// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cache-aside key/value tier
//!
//! The cache sits in front of the durable store for lookups by id. It is
//! never the system of record: a miss, an expired entry, or a backend error
//! only costs an extra durable-store read.
//!
//! # Read path
//!
//! ```text
//! get(key) ── hit ──▶ return cached value
//!    │
//!   miss ──▶ store.find_by_id ──▶ found? set(key, value, default TTL) ──▶ return
//! ```
//!
//! Writers never update the cache; they invalidate the key after the durable
//! write so the next read repopulates it from the authoritative value.
//!
//! # Keys
//!
//! `"<entity-type>:<id>"`, e.g. `"product:01934f4a-…"`. See [`entity_key`].

pub mod memory;
pub mod redis_cache;

use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use self::memory::InMemoryCache;
pub use self::redis_cache::RedisCache;

/// Errors from the cache backend
///
/// Callers on the read path treat these as a miss.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Backend could not be reached
    #[error("Cache connection error: {0}")]
    Connection(String),

    /// Backend rejected a command
    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Key/value cache with per-key TTL
///
/// No compare-and-swap: `set` overwrites unconditionally.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Cached value, or `None` on a miss (never an error for a missing key)
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store `value` with the default TTL
    async fn set(&self, key: &str, value: Vec<u8>) -> CacheResult<()> {
        self.set_with_ttl(key, value, self.default_ttl()).await
    }

    /// Store `value` for `ttl`; a zero TTL removes the key
    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    /// Remove the key; a missing key is not an error
    async fn invalidate(&self, key: &str) -> CacheResult<()>;

    /// TTL used by [`CacheStore::set`]
    fn default_ttl(&self) -> Duration;
}

/// Cached value with its expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub value: Vec<u8>,
    /// `None` when the TTL reaches past what the clock can represent
    pub expires_at: Option<tokio::time::Instant>,
}

impl CacheEntry {
    /// Entry written now that lives for `ttl`
    pub fn new(key: impl Into<String>, value: Vec<u8>, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            value,
            expires_at: tokio::time::Instant::now().checked_add(ttl),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| tokio::time::Instant::now() >= expires_at)
    }
}

/// Cache key for an entity: `"<entity-type>:<id>"`
pub fn entity_key(entity: &str, id: impl Display) -> String {
    format!("{entity}:{id}")
}

/// Cache key for a product
pub fn product_key(id: impl Display) -> String {
    entity_key("product", id)
}
