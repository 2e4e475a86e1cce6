// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-memory product store
//!
//! Reference [`ProductStore`] for tests and local runs. Enforces the
//! unique-name constraint the SQL schema carries, and counts reads and
//! writes so callers can assert which tier served a request.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use super::{ProductStore, StoreError, StoreResult};
use crate::domain::{Product, ProductId};

#[derive(Default)]
struct Counters {
    reads: AtomicU64,
    writes: AtomicU64,
}

/// In-memory [`ProductStore`]; clones share records
#[derive(Clone, Default)]
pub struct InMemoryProductStore {
    records: Arc<RwLock<BTreeMap<ProductId, Product>>>,
    counters: Arc<Counters>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `products` (not counted as writes)
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let store = Self::new();
        {
            let mut records = store.write_lock();
            for product in products {
                records.insert(product.id, product);
            }
        }
        store
    }

    /// `find_*` calls served so far
    pub fn reads(&self) -> u64 {
        self.counters.reads.load(Ordering::SeqCst)
    }

    /// `save` and `delete` calls that reached the records
    pub fn writes(&self) -> u64 {
        self.counters.writes.load(Ordering::SeqCst)
    }

    /// Make every call fail with `StoreError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store offline".to_string()));
        }
        Ok(())
    }

    fn read_lock(&self) -> RwLockReadGuard<'_, BTreeMap<ProductId, Product>> {
        self.records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, BTreeMap<ProductId, Product>> {
        self.records
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<ProductId, Product>>> {
        self.check_available()?;
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.read_lock())
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn find_by_id(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.read()?.get(&id).cloned())
    }

    async fn find_all(&self) -> StoreResult<Vec<Product>> {
        Ok(self.read()?.values().cloned().collect())
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Product>> {
        Ok(self
            .read()?
            .values()
            .find(|product| product.name == name)
            .cloned())
    }

    async fn save(&self, product: &Product) -> StoreResult<()> {
        self.check_available()?;
        let mut records = self.write_lock();
        if records
            .values()
            .any(|other| other.id != product.id && other.name == product.name)
        {
            return Err(StoreError::DuplicateName(product.name.clone()));
        }

        records.insert(product.id, product.clone());
        self.counters.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, id: ProductId) -> StoreResult<bool> {
        self.check_available()?;
        let removed = self.write_lock().remove(&id).is_some();
        self.counters.writes.fetch_add(1, Ordering::SeqCst);
        Ok(removed)
    }
}
