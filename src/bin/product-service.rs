// Copyright (c) 2025 - Cowboy AI, Inc.
//! Product Service
//!
//! Composition root for the product side of the order/product integration:
//! - Connects to NATS JetStream and declares the `events` exchange
//! - Connects the Redis cache (falls back to an in-process cache)
//! - Subscribes the inventory reconciler to `order.created`
//!
//! Run with: cargo run --bin product-service
//!
//! Environment:
//! - `NATS_URL` (default `nats://localhost:4222`, comma-separated for a cluster)
//! - `EVENTS_EXCHANGE` (default `events`)
//! - `BROKER_RETRY_LIMIT`, `BROKER_RETRY_DELAY_MS`, `BROKER_RETRY_MULTIPLIER`,
//!   `BROKER_RETRY_MAX_DELAY_MS` (default 60000, never below the base delay)
//! - `REDIS_HOST`, `REDIS_PORT`, `CACHE_TTL_SECS` (default 60)
//! - `RUST_LOG` for log filtering

use std::sync::Arc;

use anyhow::{Context, Result};
use inventory_events::{
    BrokerConnection, CacheStore, EventPublisher, EventSubscriber, ExchangeConfig,
    InMemoryCache, InMemoryProductStore, InventoryReconciler, NatsConnector, OrderCreated,
    ProductService, ProductStore, RedisCache, ServiceConfig,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("🚀 Starting Product Service");

    let config = ServiceConfig::from_env().context("Invalid configuration")?;
    info!(
        servers = ?config.nats.servers,
        exchange = %config.exchange,
        retry_attempts = config.retry.attempts,
        retry_delay_ms = config.retry.delay.as_millis() as u64,
        redis = %config.cache.url(),
        "📋 Configuration loaded"
    );

    // Broker: exhausting the retry budget aborts startup
    let connection = Arc::new(BrokerConnection::new(
        Arc::new(NatsConnector::new(config.nats.clone())),
        ExchangeConfig::topic(config.exchange.clone()),
    ));
    connection
        .connect(&config.retry)
        .await
        .context("Failed to connect to message broker")?;
    info!("✅ Broker ready");

    // Cache: degraded mode keeps serving from the durable store
    let cache: Arc<dyn CacheStore> = match RedisCache::connect(&config.cache).await {
        Ok(redis) => Arc::new(redis),
        Err(e) => {
            warn!(error = %e, "⚠️ Redis unavailable, using in-process cache");
            Arc::new(InMemoryCache::new(config.cache.default_ttl))
        }
    };

    let store: Arc<dyn ProductStore> = Arc::new(InMemoryProductStore::new());
    let publisher = EventPublisher::new(Arc::clone(&connection));
    let products = ProductService::new(Arc::clone(&store), Arc::clone(&cache), publisher);
    let catalog_size = products
        .list()
        .await
        .context("Failed to read product catalog")?
        .len();
    info!(products = catalog_size, "📦 Product catalog loaded");

    let reconciler = Arc::new(InventoryReconciler::new(store, cache));
    let subscription = EventSubscriber::new(Arc::clone(&connection))
        .subscribe::<OrderCreated, _>(reconciler)
        .await
        .context("Failed to subscribe inventory reconciler")?;
    info!(routing_keys = ?subscription.routing_keys(), "🎧 Inventory reconciler consuming");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    let stats = subscription.stats();
    info!(
        received = stats.received,
        handled = stats.handled,
        handler_failures = stats.handler_failures,
        decode_failures = stats.decode_failures,
        "🛑 Shutting down"
    );
    Ok(())
}
