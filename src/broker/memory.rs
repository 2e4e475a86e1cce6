// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-process broker
//!
//! Implements [`Connector`] and [`Transport`] with the same topic routing
//! the NATS transport provides, so publishers, subscribers and the
//! reconciler can be exercised without a server. Cloning shares state.
//!
//! Each bound queue is an unbounded channel; a published message is copied
//! to every queue with a matching binding. Queues whose receiver was dropped
//! are pruned on the next publish.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

use super::{Acknowledger, Connector, Delivery, DeliveryStream, ExchangeConfig, Transport};
use crate::errors::{BrokerError, BrokerResult};
use crate::subjects;

struct Queue {
    exchange: String,
    patterns: Vec<String>,
    sender: mpsc::UnboundedSender<Delivery>,
}

#[derive(Default)]
struct BrokerState {
    exchanges: HashMap<String, ExchangeConfig>,
    queues: Vec<Queue>,
}

#[derive(Default)]
struct Counters {
    connect_attempts: AtomicU64,
    refused_connections: AtomicU32,
    published: AtomicU64,
    acknowledged: Arc<AtomicU64>,
}

/// In-memory topic broker
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    counters: Arc<Counters>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` dial attempts fail as unreachable
    pub fn refuse_connections(&self, count: u32) {
        self.counters
            .refused_connections
            .store(count, Ordering::SeqCst);
    }

    /// Dial attempts seen so far, successful or not
    pub fn connect_attempts(&self) -> u64 {
        self.counters.connect_attempts.load(Ordering::SeqCst)
    }

    /// Messages accepted by `publish`
    pub fn published(&self) -> u64 {
        self.counters.published.load(Ordering::SeqCst)
    }

    /// Deliveries acknowledged by consumers
    pub fn acknowledged(&self) -> u64 {
        self.counters.acknowledged.load(Ordering::SeqCst)
    }

    /// Whether an exchange with this name was declared
    pub fn has_exchange(&self, name: &str) -> bool {
        self.lock().exchanges.contains_key(name)
    }

    /// Queues currently bound (receivers still alive)
    pub fn bound_queues(&self) -> usize {
        self.lock()
            .queues
            .iter()
            .filter(|queue| !queue.sender.is_closed())
            .count()
    }

    /// Inject raw bytes as if published by another service
    pub fn inject(&self, exchange: &str, routing_key: &str, payload: impl Into<Bytes>) -> usize {
        self.route(exchange, routing_key, payload.into())
    }

    fn route(&self, exchange: &str, routing_key: &str, payload: Bytes) -> usize {
        let mut state = self.lock();
        state.queues.retain(|queue| !queue.sender.is_closed());

        let mut delivered = 0;
        for queue in state.queues.iter().filter(|queue| {
            queue.exchange == exchange
                && queue
                    .patterns
                    .iter()
                    .any(|pattern| subjects::matches(pattern, routing_key))
        }) {
            let delivery = Delivery::new(
                routing_key,
                payload.clone(),
                Box::new(CountingAck {
                    acknowledged: Arc::clone(&self.counters.acknowledged),
                }),
            );
            if queue.sender.send(delivery).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    // A poisoned lock only means a test thread panicked mid-update; the
    // routing table itself is still consistent.
    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct CountingAck {
    acknowledged: Arc<AtomicU64>,
}

#[async_trait]
impl Acknowledger for CountingAck {
    async fn ack(&self) -> BrokerResult<()> {
        self.acknowledged.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Connector for InMemoryBroker {
    async fn connect(&self) -> BrokerResult<Arc<dyn Transport>> {
        self.counters.connect_attempts.fetch_add(1, Ordering::SeqCst);

        let refused = self.counters.refused_connections.fetch_update(
            Ordering::SeqCst,
            Ordering::SeqCst,
            |remaining| remaining.checked_sub(1),
        );
        if refused.is_ok() {
            return Err(BrokerError::Unreachable(
                "in-memory broker refused connection".to_string(),
            ));
        }

        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl Transport for InMemoryBroker {
    async fn declare_exchange(&self, exchange: &ExchangeConfig) -> BrokerResult<()> {
        let mut state = self.lock();
        match state.exchanges.get(&exchange.name) {
            Some(existing) => match existing.difference(exchange) {
                Some(reason) => Err(BrokerError::ExchangeMismatch {
                    name: exchange.name.clone(),
                    reason,
                }),
                None => Ok(()),
            },
            None => {
                state
                    .exchanges
                    .insert(exchange.name.clone(), exchange.clone());
                debug!(exchange = %exchange.name, "Exchange declared");
                Ok(())
            }
        }
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: Bytes,
    ) -> BrokerResult<()> {
        if !self.has_exchange(exchange) {
            return Err(BrokerError::UnknownExchange(exchange.to_string()));
        }

        let delivered = self.route(exchange, routing_key, payload);
        self.counters.published.fetch_add(1, Ordering::SeqCst);
        debug!(exchange, routing_key, queues = delivered, "Message routed");
        Ok(())
    }

    async fn bind_queue(
        &self,
        exchange: &str,
        patterns: &[String],
    ) -> BrokerResult<DeliveryStream> {
        let mut state = self.lock();
        if !state.exchanges.contains_key(exchange) {
            return Err(BrokerError::UnknownExchange(exchange.to_string()));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        state.queues.push(Queue {
            exchange: exchange.to_string(),
            patterns: patterns.to_vec(),
            sender,
        });

        Ok(UnboundedReceiverStream::new(receiver).map(Ok).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ready_broker() -> InMemoryBroker {
        let broker = InMemoryBroker::new();
        broker
            .declare_exchange(&ExchangeConfig::default())
            .await
            .unwrap();
        broker
    }

    #[tokio::test]
    async fn test_routes_by_pattern() {
        let broker = ready_broker().await;
        let mut orders = broker
            .bind_queue("events", &["order.*".to_string()])
            .await
            .unwrap();
        let mut products = broker
            .bind_queue("events", &["product.created".to_string()])
            .await
            .unwrap();

        broker
            .publish("events", "order.created", Bytes::from_static(b"{}"))
            .await
            .unwrap();

        let delivery = orders.next().await.unwrap().unwrap();
        assert_eq!(delivery.routing_key, "order.created");
        delivery.ack().await.unwrap();

        assert_eq!(broker.acknowledged(), 1);
        assert!(futures::FutureExt::now_or_never(products.next()).is_none());
    }

    #[tokio::test]
    async fn test_redeclare_identical_is_idempotent() {
        let broker = ready_broker().await;
        assert!(broker
            .declare_exchange(&ExchangeConfig::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_redeclare_different_is_rejected() {
        let broker = ready_broker().await;
        let err = broker
            .declare_exchange(&ExchangeConfig::default().transient())
            .await
            .unwrap_err();

        assert!(matches!(err, BrokerError::ExchangeMismatch { .. }));
    }

    #[tokio::test]
    async fn test_publish_to_undeclared_exchange() {
        let broker = InMemoryBroker::new();
        let err = broker
            .publish("events", "order.created", Bytes::new())
            .await
            .unwrap_err();

        assert_eq!(err, BrokerError::UnknownExchange("events".into()));
    }

    #[tokio::test]
    async fn test_dropped_queue_is_pruned() {
        let broker = ready_broker().await;
        let queue = broker
            .bind_queue("events", &["order.created".to_string()])
            .await
            .unwrap();
        assert_eq!(broker.bound_queues(), 1);

        drop(queue);
        assert_eq!(broker.inject("events", "order.created", "{}"), 0);
        assert_eq!(broker.bound_queues(), 0);
    }

    #[tokio::test]
    async fn test_refused_connections() {
        let broker = InMemoryBroker::new();
        broker.refuse_connections(2);

        assert!(broker.connect().await.is_err());
        assert!(broker.connect().await.is_err());
        assert!(broker.connect().await.is_ok());
        assert_eq!(broker.connect_attempts(), 3);
    }
}
