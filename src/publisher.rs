// Copyright (c) 2025 - Cowboy AI, Inc.
//! Event publisher
//!
//! Serializes an event to JSON and hands it to the shared topic exchange
//! under its routing key. Publishing suspends until the broker connection
//! is ready; if the connection failed, the publish fails with the same
//! cause instead of waiting forever.
//!
//! Delivery is fire-and-forget from the caller's point of view: success
//! means the broker accepted the message, not that any consumer saw it.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::broker::BrokerConnection;
use crate::errors::BrokerError;
use crate::events::DomainEvent;
use crate::subjects::{self, RoutingKeyError};

/// Errors that can occur while publishing
#[derive(Debug, Error)]
pub enum PublishError {
    /// The broker connection never became ready
    #[error("Broker connection unavailable: {0}")]
    ConnectionFailed(BrokerError),

    /// Routing key is empty, malformed, or contains wildcards
    #[error("Invalid routing key: {0}")]
    InvalidRoutingKey(#[from] RoutingKeyError),

    /// Payload could not be encoded as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The broker rejected or dropped the message
    #[error("Publish failed: {0}")]
    Transport(BrokerError),
}

/// Publishes events to the shared exchange
#[derive(Clone)]
pub struct EventPublisher {
    connection: Arc<BrokerConnection>,
}

impl EventPublisher {
    pub fn new(connection: Arc<BrokerConnection>) -> Self {
        Self { connection }
    }

    /// Publish a typed event under its own routing key
    pub async fn publish<E: DomainEvent>(&self, event: &E) -> Result<(), PublishError> {
        self.publish_to(E::ROUTING_KEY, event).await
    }

    /// Publish any serializable payload under an explicit routing key
    ///
    /// # Errors
    ///
    /// Wildcards are rejected; a routing key names exactly one kind of fact.
    pub async fn publish_to<T>(&self, routing_key: &str, payload: &T) -> Result<(), PublishError>
    where
        T: Serialize + ?Sized,
    {
        subjects::validate_routing_key(routing_key)?;
        let body = Bytes::from(serde_json::to_vec(payload)?);

        let transport = self
            .connection
            .await_ready()
            .await
            .map_err(PublishError::ConnectionFailed)?;

        let exchange = &self.connection.exchange().name;
        let size = body.len();
        transport
            .publish(exchange, routing_key, body)
            .await
            .map_err(|e| {
                warn!(error = %e, exchange = %exchange, routing_key, "Publish failed");
                PublishError::Transport(e)
            })?;

        debug!(exchange = %exchange, routing_key, size, "Event published");
        Ok(())
    }
}
