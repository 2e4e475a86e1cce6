// Copyright (c) 2025 - Cowboy AI, Inc.
//! Process-local cache
//!
//! Expired entries are dropped lazily on read. Time comes from
//! `tokio::time`, so tests can pause and advance the clock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::{CacheEntry, CacheResult, CacheStore};

/// In-memory [`CacheStore`]
///
/// Used in tests and as the fallback when Redis is unreachable at startup.
/// Clones share entries.
#[derive(Clone)]
pub struct InMemoryCache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
    default_ttl: Duration,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl InMemoryCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            default_ttl,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::SeqCst)
    }

    /// Whether a live entry exists for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.lock()
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut entries = self.lock();
        let value = match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        };

        let counter = if value.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let mut entries = self.lock();
        if ttl.is_zero() {
            entries.remove(key);
        } else {
            entries.insert(key.to_string(), CacheEntry::new(key, value, ttl));
        }
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> CacheResult<()> {
        self.lock().remove(key);
        Ok(())
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}
