// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for inventory-events
//!
//! Deterministic products and orders plus a fully wired in-memory
//! environment (broker, store, cache) shared by the integration suites.
//!
//! # Design Principles
//! - Product and order ids are fixed constants
//! - Timestamps are fixed; nothing reads the wall clock
//! - Every suite gets its own isolated broker, store and cache

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use inventory_events::{
    BrokerConnection, Decimal, EventPublisher, EventSubscriber, ExchangeConfig, InMemoryBroker,
    InMemoryCache, InMemoryProductStore, InventoryReconciler, OrderCreated, Product, ProductId,
    ProductService, RetryPolicy, Subscription,
};

pub const PRODUCT_ID_1: &str = "01934f4a-1000-7000-8000-000000001000";
pub const PRODUCT_ID_2: &str = "01934f4a-2000-7000-8000-000000002000";
pub const MISSING_PRODUCT_ID: &str = "01934f4a-dead-7000-8000-00000000dead";

pub const ORDER_ID_1: &str = "01934f4a-0001-7000-8000-000000000001";

// Fixed test timestamp (2026-01-19T12:00:00Z)
pub const FIXED_TIMESTAMP: &str = "2026-01-19T12:00:00Z";

pub fn product_id(s: &str) -> ProductId {
    ProductId::from_uuid(Uuid::parse_str(s).expect("Invalid UUID in test fixture"))
}

pub fn fixed_timestamp() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(FIXED_TIMESTAMP)
        .expect("Invalid timestamp in test fixture")
        .with_timezone(&Utc)
}

/// Product with a fixed id and timestamp
pub fn product_fixture(id: &str, name: &str, qty: u32) -> Product {
    Product {
        id: product_id(id),
        name: name.to_string(),
        price: Decimal::new(999, 2),
        qty,
        created_at: fixed_timestamp(),
    }
}

pub fn widget(qty: u32) -> Product {
    product_fixture(PRODUCT_ID_1, "Widget", qty)
}

pub fn gadget(qty: u32) -> Product {
    product_fixture(PRODUCT_ID_2, "Gadget", qty)
}

pub fn order_fixture(product: &str, qty: u32) -> OrderCreated {
    OrderCreated::new(product_id(product), qty).with_order_id(ORDER_ID_1)
}

/// Policy that never sleeps between attempts
pub fn immediate_retry(attempts: u32) -> RetryPolicy {
    RetryPolicy::fixed(attempts, Duration::ZERO)
}

pub fn connection_for(broker: &InMemoryBroker) -> Arc<BrokerConnection> {
    Arc::new(BrokerConnection::new(
        Arc::new(broker.clone()),
        ExchangeConfig::default(),
    ))
}

/// Connected broker, seeded store, empty cache, and the components over them
pub struct TestEnv {
    pub broker: InMemoryBroker,
    pub connection: Arc<BrokerConnection>,
    pub store: InMemoryProductStore,
    pub cache: InMemoryCache,
    pub publisher: EventPublisher,
    pub subscriber: EventSubscriber,
    pub reconciler: Arc<InventoryReconciler>,
    pub service: ProductService,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_products(Vec::<Product>::new()).await
    }

    pub async fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let broker = InMemoryBroker::new();
        let connection = connection_for(&broker);
        connection
            .connect(&immediate_retry(1))
            .await
            .expect("in-memory broker connects");

        let store = InMemoryProductStore::with_products(products);
        let cache = InMemoryCache::new(Duration::from_secs(60));
        let publisher = EventPublisher::new(Arc::clone(&connection));
        let subscriber = EventSubscriber::new(Arc::clone(&connection));
        let reconciler = Arc::new(InventoryReconciler::new(
            Arc::new(store.clone()),
            Arc::new(cache.clone()),
        ));
        let service = ProductService::new(
            Arc::new(store.clone()),
            Arc::new(cache.clone()),
            publisher.clone(),
        );

        Self {
            broker,
            connection,
            store,
            cache,
            publisher,
            subscriber,
            reconciler,
            service,
        }
    }

    /// Bind the reconciler to `order.created`
    pub async fn start_reconciler(&self) -> Subscription {
        self.subscriber
            .subscribe::<OrderCreated, _>(Arc::clone(&self.reconciler))
            .await
            .expect("reconciler subscribes")
    }
}
