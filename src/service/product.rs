// Copyright (c) 2025 - Cowboy AI, Inc.
//! Product Service
//!
//! Product use-cases around the integration core:
//!
//! ```text
//! create ──▶ validate ──▶ store.save ──▶ publish product.created
//! get    ──▶ cache ── miss ──▶ store.find_by_id ──▶ cache.set
//! update ──▶ store.save ──▶ cache.invalidate
//! delete ──▶ store.delete ──▶ cache.invalidate
//! ```
//!
//! # Consistency
//!
//! The store is written first and is authoritative. There is no two-phase
//! commit with the broker: if publishing fails after a save, the product
//! exists and the caller gets [`ServiceError::PublishFailed`]. Cache
//! failures never fail an operation; they are logged and the cache is
//! treated as empty.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{self, CacheStore};
use crate::domain::{NewProduct, Product, ProductError, ProductId, ProductUpdate};
use crate::events::ProductCreated;
use crate::publisher::{EventPublisher, PublishError};
use crate::store::{ProductStore, StoreError};

/// Service layer result type
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service layer errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Input violates a product invariant
    #[error("Invalid product: {0}")]
    Invalid(#[from] ProductError),

    /// Another product already uses this name
    #[error("Product name already exists: {0}")]
    DuplicateName(String),

    #[error("Product not found: {0}")]
    NotFound(ProductId),

    /// Durable store failure
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Product was saved but `product.created` could not be published
    #[error("Product {product_id} saved but event publish failed: {source}")]
    PublishFailed {
        product_id: ProductId,
        #[source]
        source: PublishError,
    },
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateName(name) => ServiceError::DuplicateName(name),
            other => ServiceError::Store(other),
        }
    }
}

/// Product use-cases over the durable store, the cache and the broker
#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn ProductStore>,
    cache: Arc<dyn CacheStore>,
    publisher: EventPublisher,
}

impl ProductService {
    pub fn new(
        store: Arc<dyn ProductStore>,
        cache: Arc<dyn CacheStore>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            store,
            cache,
            publisher,
        }
    }

    /// Validate, persist, then announce a new product
    pub async fn create(&self, input: NewProduct) -> ServiceResult<Product> {
        let product = Product::create(input)?;

        if self.store.find_by_name(&product.name).await?.is_some() {
            return Err(ServiceError::DuplicateName(product.name));
        }
        self.store.save(&product).await?;
        info!(product_id = %product.id, name = %product.name, qty = product.qty, "Product created");

        self.publisher
            .publish(&ProductCreated::from(product.clone()))
            .await
            .map_err(|source| ServiceError::PublishFailed {
                product_id: product.id,
                source,
            })?;

        Ok(product)
    }

    /// Every product, ordered by id
    pub async fn list(&self) -> ServiceResult<Vec<Product>> {
        Ok(self.store.find_all().await?)
    }

    /// Cache-aside lookup by id
    pub async fn get_by_id(&self, id: ProductId) -> ServiceResult<Product> {
        let key = cache::product_key(id);

        match self.cache.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<Product>(&bytes) {
                Ok(product) => {
                    debug!(product_id = %id, "Cache hit");
                    return Ok(product);
                }
                Err(e) => warn!(error = %e, key = %key, "Discarding undecodable cache entry"),
            },
            Ok(None) => debug!(product_id = %id, "Cache miss"),
            Err(e) => warn!(error = %e, key = %key, "Cache read failed, using store"),
        }

        let product = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound(id))?;

        match serde_json::to_vec(&product) {
            Ok(bytes) => {
                if let Err(e) = self.cache.set(&key, bytes).await {
                    warn!(error = %e, key = %key, "Cache write failed");
                }
            }
            Err(e) => warn!(error = %e, key = %key, "Product not cacheable"),
        }

        Ok(product)
    }

    /// Apply a partial update and drop the cached copy
    pub async fn update(&self, id: ProductId, update: ProductUpdate) -> ServiceResult<Product> {
        let mut product = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound(id))?;

        product.apply(update)?;
        self.store.save(&product).await?;
        self.invalidate(id).await;

        info!(product_id = %id, "Product updated");
        Ok(product)
    }

    /// Remove a product and drop the cached copy
    pub async fn delete(&self, id: ProductId) -> ServiceResult<()> {
        if !self.store.delete(id).await? {
            return Err(ServiceError::NotFound(id));
        }
        self.invalidate(id).await;

        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    async fn invalidate(&self, id: ProductId) {
        let key = cache::product_key(id);
        if let Err(e) = self.cache.invalidate(&key).await {
            warn!(error = %e, key = %key, "Cache invalidation failed, entry expires by TTL");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{BrokerConnection, ExchangeConfig, InMemoryBroker};
    use crate::cache::InMemoryCache;
    use crate::config::RetryPolicy;
    use crate::domain::Decimal;
    use crate::store::InMemoryProductStore;
    use std::time::Duration;

    struct Harness {
        broker: InMemoryBroker,
        store: InMemoryProductStore,
        cache: InMemoryCache,
        service: ProductService,
    }

    async fn harness() -> Harness {
        let broker = InMemoryBroker::new();
        let connection = Arc::new(BrokerConnection::new(
            Arc::new(broker.clone()),
            ExchangeConfig::default(),
        ));
        connection
            .connect(&RetryPolicy::fixed(1, Duration::ZERO))
            .await
            .unwrap();

        let store = InMemoryProductStore::new();
        let cache = InMemoryCache::default();
        let service = ProductService::new(
            Arc::new(store.clone()),
            Arc::new(cache.clone()),
            EventPublisher::new(connection),
        );
        Harness {
            broker,
            store,
            cache,
            service,
        }
    }

    #[tokio::test]
    async fn test_create_persists_and_publishes() {
        let h = harness().await;

        let product = h
            .service
            .create(NewProduct::new("Widget", Decimal::TWO, 10))
            .await
            .unwrap();

        assert_eq!(h.store.writes(), 1);
        assert_eq!(h.broker.published(), 1);
        assert_eq!(h.service.list().await.unwrap(), vec![product]);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_and_duplicate() {
        let h = harness().await;
        h.service
            .create(NewProduct::new("Widget", Decimal::TWO, 10))
            .await
            .unwrap();

        assert!(matches!(
            h.service.create(NewProduct::new("", Decimal::TWO, 1)).await,
            Err(ServiceError::Invalid(ProductError::EmptyName))
        ));
        assert!(matches!(
            h.service.create(NewProduct::new("Widget", Decimal::ONE, 1)).await,
            Err(ServiceError::DuplicateName(_))
        ));
        assert_eq!(h.broker.published(), 1);
    }

    #[tokio::test]
    async fn test_get_by_id_populates_cache() {
        let h = harness().await;
        let product = h
            .service
            .create(NewProduct::new("Widget", Decimal::TWO, 10))
            .await
            .unwrap();
        let reads_before = h.store.reads();

        assert_eq!(h.service.get_by_id(product.id).await.unwrap(), product);
        assert_eq!(h.service.get_by_id(product.id).await.unwrap(), product);

        assert_eq!(h.store.reads(), reads_before + 1);
        assert_eq!(h.cache.hits(), 1);
    }

    #[tokio::test]
    async fn test_cached_entry_keeps_price_as_decimal_string() {
        let h = harness().await;
        let product = h
            .service
            .create(NewProduct::new("Widget", Decimal::new(1999, 2), 10))
            .await
            .unwrap();
        h.service.get_by_id(product.id).await.unwrap();

        let cached = h
            .cache
            .get(&cache::product_key(product.id))
            .await
            .unwrap()
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&cached).unwrap();
        assert_eq!(json["price"], "19.99");
    }

    #[tokio::test]
    async fn test_undecodable_cache_entry_falls_through() {
        let h = harness().await;
        let product = h
            .service
            .create(NewProduct::new("Widget", Decimal::TWO, 10))
            .await
            .unwrap();
        h.cache
            .set(&cache::product_key(product.id), b"garbage".to_vec())
            .await
            .unwrap();

        assert_eq!(h.service.get_by_id(product.id).await.unwrap(), product);
    }

    #[tokio::test]
    async fn test_update_invalidates_cache() {
        let h = harness().await;
        let product = h
            .service
            .create(NewProduct::new("Widget", Decimal::TWO, 10))
            .await
            .unwrap();
        h.service.get_by_id(product.id).await.unwrap();

        let updated = h
            .service
            .update(
                product.id,
                ProductUpdate {
                    price: Some(Decimal::new(3, 0)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(!h.cache.contains(&cache::product_key(product.id)));
        assert_eq!(h.service.get_by_id(product.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_delete_missing_product() {
        let h = harness().await;
        assert!(matches!(
            h.service.delete(ProductId::new()).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_invalidates_cache() {
        let h = harness().await;
        let product = h
            .service
            .create(NewProduct::new("Widget", Decimal::TWO, 10))
            .await
            .unwrap();
        h.service.get_by_id(product.id).await.unwrap();

        h.service.delete(product.id).await.unwrap();

        assert!(matches!(
            h.service.get_by_id(product.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
