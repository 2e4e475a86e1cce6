// Copyright (c) 2025 - Cowboy AI, Inc.
//! Event integration between the order and product services
//!
//! A resilient NATS JetStream client (connection retry, readiness gating,
//! topic publish/subscribe) combined with a cache-aside read path and the
//! inventory reconciler that applies `order.created` events to stock.
//!
//! ```text
//! order service ──order.created──▶ EventSubscriber ──▶ InventoryReconciler
//!                                                         │
//!                                         store.save ◀────┤
//!                                   cache.invalidate ◀────┘
//!
//! ProductService.create ──▶ store.save ──▶ EventPublisher ──product.created──▶
//! ```

pub mod broker;
pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod publisher;
pub mod reconciler;
pub mod service;
pub mod state_machine;
pub mod store;
pub mod subjects;
pub mod subscriber;

// Re-export commonly used types
pub use broker::{BrokerConnection, ExchangeConfig, InMemoryBroker, NatsConnector, ReadinessGate};
pub use cache::{CacheError, CacheStore, InMemoryCache, RedisCache};
pub use config::{CacheConfig, ConfigError, NatsConfig, RetryPolicy, ServiceConfig};
pub use domain::{Decimal, NewProduct, Product, ProductError, ProductId, ProductUpdate};
pub use errors::{BrokerError, BrokerResult};
pub use events::{DomainEvent, OrderCreated, ProductCreated};
pub use publisher::{EventPublisher, PublishError};
pub use reconciler::{InventoryReconciler, ReconcileOutcome};
pub use service::{ProductService, ServiceError};
pub use state_machine::{ConnectionState, SubscriptionState};
pub use store::{InMemoryProductStore, ProductStore, StoreError};
pub use subscriber::{EventHandler, EventSubscriber, FnEventHandler, Subscription, SubscriptionStats};
