// Copyright (c) 2025 - Cowboy AI, Inc.
//! Message broker client
//!
//! The broker layer owns the physical link to the message bus. Everything
//! above it (publishers, subscribers) borrows a [`BrokerConnection`] and
//! waits on its readiness gate instead of touching the transport directly.
//!
//! # Architecture
//!
//! ```text
//! Connector ──dial──▶ Transport ──declare──▶ exchange "events" (topic)
//!     ▲                   │
//!     │ retry / delay     ├── publish(routing key, payload)
//!     │                   └── bind_queue(routing keys) ──▶ DeliveryStream
//! BrokerConnection ──▶ ReadinessGate (resolves once: Ready | Failed)
//! ```
//!
//! Two transports are provided:
//!
//! - [`nats`] - NATS JetStream. The exchange is a stream capturing
//!   `{exchange}.>`, a queue is an ephemeral pull consumer per routing key.
//! - [`memory`] - in-process broker with the same routing semantics.

pub mod connection;
pub mod memory;
pub mod nats;
pub mod readiness;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::errors::BrokerResult;
use crate::subjects::DEFAULT_EXCHANGE;

pub use connection::BrokerConnection;
pub use memory::InMemoryBroker;
pub use nats::{NatsConnector, NatsTransport};
pub use readiness::ReadinessGate;

/// Exchange routing type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    /// Route by dot-segmented routing key patterns
    Topic,
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeKind::Topic => write!(f, "topic"),
        }
    }
}

/// Exchange declaration parameters
///
/// Re-declaring with identical parameters is a no-op; differing parameters
/// are a fatal configuration error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeConfig {
    /// Exchange name, also the subject namespace on the wire
    pub name: String,
    /// Routing type
    pub kind: ExchangeKind,
    /// Survives broker restarts
    pub durable: bool,
}

impl ExchangeConfig {
    /// Durable topic exchange with the given name
    pub fn topic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ExchangeKind::Topic,
            durable: true,
        }
    }

    /// Non-durable variant (memory storage)
    pub fn transient(mut self) -> Self {
        self.durable = false;
        self
    }

    /// Human-readable difference from another declaration, if any
    pub fn difference(&self, other: &ExchangeConfig) -> Option<String> {
        if self.kind != other.kind {
            return Some(format!("kind {} != {}", self.kind, other.kind));
        }
        if self.durable != other.durable {
            return Some(format!("durable {} != {}", self.durable, other.durable));
        }
        None
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self::topic(DEFAULT_EXCHANGE)
    }
}

/// Acknowledges a single delivery back to the broker
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn ack(&self) -> BrokerResult<()>;
}

/// A message delivered to a bound queue
pub struct Delivery {
    /// Routing key the message was published under (exchange prefix removed)
    pub routing_key: String,
    /// Undecoded payload
    pub payload: Bytes,
    acker: Box<dyn Acknowledger>,
}

impl Delivery {
    pub fn new(
        routing_key: impl Into<String>,
        payload: Bytes,
        acker: Box<dyn Acknowledger>,
    ) -> Self {
        Self {
            routing_key: routing_key.into(),
            payload,
            acker,
        }
    }

    /// Acknowledge the message; consumes the delivery
    pub async fn ack(self) -> BrokerResult<()> {
        self.acker.ack().await
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("routing_key", &self.routing_key)
            .field("payload_size", &self.payload.len())
            .finish()
    }
}

/// Deliveries for one bound queue, in broker order
pub type DeliveryStream = BoxStream<'static, BrokerResult<Delivery>>;

/// An established link to the broker
#[async_trait]
pub trait Transport: Send + Sync {
    /// Declare the exchange, or verify an existing declaration matches
    async fn declare_exchange(&self, exchange: &ExchangeConfig) -> BrokerResult<()>;

    /// Hand a payload to the exchange under a routing key
    async fn publish(&self, exchange: &str, routing_key: &str, payload: Bytes)
        -> BrokerResult<()>;

    /// Declare a private, non-durable queue bound to the given patterns
    async fn bind_queue(&self, exchange: &str, patterns: &[String])
        -> BrokerResult<DeliveryStream>;
}

/// Makes one attempt at establishing a transport
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> BrokerResult<Arc<dyn Transport>>;
}
