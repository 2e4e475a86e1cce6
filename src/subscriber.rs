// Copyright (c) 2025 - Cowboy AI, Inc.
//! Event subscriber
//!
//! A subscription owns one private queue bound to its routing keys and one
//! dedicated task draining it. Messages are handled strictly one at a time:
//!
//! ```text
//! delivery ──decode──▶ E ──handler.handle(E)──▶ ack
//!              │                 │
//!              └─ undecodable:   └─ error or panic:
//!                 log, drop, ack    log, ack
//! ```
//!
//! Every delivery is acknowledged exactly once whatever the outcome, so a
//! poison message or a failing handler never blocks the queue. There is no
//! redelivery or dead-letter path.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{FutureExt, StreamExt};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::broker::{BrokerConnection, DeliveryStream};
use crate::errors::BrokerError;
use crate::events::DomainEvent;
use crate::state_machine::{StateMachine, SubscriptionEvent, SubscriptionState};
use crate::subjects::{self, RoutingKeyError};

/// Errors that can occur while setting up a subscription
#[derive(Debug, Error)]
pub enum SubscribeError {
    /// The broker connection never became ready
    #[error("Broker connection unavailable: {0}")]
    ConnectionFailed(BrokerError),

    /// At least one routing key is required
    #[error("Subscription needs at least one routing key")]
    NoRoutingKeys,

    /// A binding pattern is malformed
    #[error("Invalid routing key: {0}")]
    InvalidRoutingKey(#[from] RoutingKeyError),

    /// Queue declaration or binding failed
    #[error("Queue binding failed: {0}")]
    Bind(BrokerError),

    /// Subscription state machine rejected a step
    #[error("Invalid subscription state: {0}")]
    InvalidState(String),
}

/// Handles decoded events for one subscription
///
/// Returning an error (or panicking) is logged and the message is still
/// acknowledged.
#[async_trait]
pub trait EventHandler<E>: Send + Sync {
    async fn handle(&self, event: E) -> anyhow::Result<()>;
}

/// Adapts an async closure into an [`EventHandler`]
///
/// ```rust,no_run
/// use inventory_events::subscriber::FnEventHandler;
/// use inventory_events::events::OrderCreated;
///
/// let handler = FnEventHandler::new(|event: OrderCreated| async move {
///     tracing::info!(qty = event.qty, "order seen");
///     Ok::<_, anyhow::Error>(())
/// });
/// ```
pub struct FnEventHandler<F> {
    f: F,
}

impl<F> FnEventHandler<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<E, F, Fut> EventHandler<E> for FnEventHandler<F>
where
    E: Send + 'static,
    F: Fn(E) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn handle(&self, event: E) -> anyhow::Result<()> {
        (self.f)(event).await
    }
}

/// Counters for one subscription
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionStats {
    /// Deliveries taken off the queue
    pub received: u64,
    /// Handler returned `Ok`
    pub handled: u64,
    /// Handler returned an error or panicked
    pub handler_failures: u64,
    /// Payload could not be decoded; handler not invoked
    pub decode_failures: u64,
    /// Acknowledgements accepted by the broker
    pub acknowledged: u64,
}

impl SubscriptionStats {
    /// Deliveries whose processing finished, whatever the outcome
    pub fn processed(&self) -> u64 {
        self.handled + self.handler_failures + self.decode_failures
    }
}

/// Handle to a running subscription
///
/// Dropping the handle leaves the consumption loop running for the life of
/// the process.
pub struct Subscription {
    routing_keys: Vec<String>,
    state: SubscriptionState,
    stats: watch::Receiver<SubscriptionStats>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Routing keys (or patterns) the queue is bound to
    pub fn routing_keys(&self) -> &[String] {
        &self.routing_keys
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> SubscriptionStats {
        *self.stats.borrow()
    }

    /// Whether the consumption loop has ended (delivery stream closed)
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Suspend until at least `count` deliveries finished processing
    ///
    /// Returns early with the last snapshot if the loop ends first.
    pub async fn wait_processed(&self, count: u64) -> SubscriptionStats {
        let mut stats = self.stats.clone();
        let waited = stats
            .wait_for(|s| s.processed() >= count)
            .await
            .map(|snapshot| *snapshot);
        match waited {
            Ok(snapshot) => snapshot,
            Err(_) => *stats.borrow(),
        }
    }
}

/// Binds handlers to routing keys on the shared exchange
#[derive(Clone)]
pub struct EventSubscriber {
    connection: Arc<BrokerConnection>,
}

impl EventSubscriber {
    pub fn new(connection: Arc<BrokerConnection>) -> Self {
        Self { connection }
    }

    /// Subscribe `handler` to the routing key of `E`
    pub async fn subscribe<E, H>(&self, handler: Arc<H>) -> Result<Subscription, SubscribeError>
    where
        E: DomainEvent,
        H: EventHandler<E> + 'static,
    {
        self.subscribe_to::<E, H, _>([E::ROUTING_KEY], handler).await
    }

    /// Subscribe `handler` to one or more routing keys or patterns
    ///
    /// Suspends until the broker connection is ready.
    pub async fn subscribe_to<E, H, K>(
        &self,
        routing_keys: impl IntoIterator<Item = K>,
        handler: Arc<H>,
    ) -> Result<Subscription, SubscribeError>
    where
        E: DeserializeOwned + Send + 'static,
        H: EventHandler<E> + 'static,
        K: Into<String>,
    {
        let routing_keys: Vec<String> = routing_keys.into_iter().map(Into::into).collect();
        if routing_keys.is_empty() {
            return Err(SubscribeError::NoRoutingKeys);
        }
        for key in &routing_keys {
            subjects::validate_pattern(key)?;
        }

        let transport = self
            .connection
            .await_ready()
            .await
            .map_err(SubscribeError::ConnectionFailed)?;

        let exchange = self.connection.exchange().name.clone();
        let deliveries = transport
            .bind_queue(&exchange, &routing_keys)
            .await
            .map_err(SubscribeError::Bind)?;
        let state = advance(SubscriptionState::Unbound, SubscriptionEvent::Bind)?;

        let (stats_tx, stats_rx) = watch::channel(SubscriptionStats::default());
        let task = tokio::spawn(consume::<E, H>(
            routing_keys.clone(),
            deliveries,
            handler,
            stats_tx,
        ));
        let state = advance(state, SubscriptionEvent::StartConsuming)?;

        info!(exchange = %exchange, routing_keys = ?routing_keys, "Subscription consuming");

        Ok(Subscription {
            routing_keys,
            state,
            stats: stats_rx,
            task,
        })
    }
}

fn advance(
    state: SubscriptionState,
    input: SubscriptionEvent,
) -> Result<SubscriptionState, SubscribeError> {
    state
        .transition(&input)
        .map(|(next, ())| next)
        .map_err(|e| SubscribeError::InvalidState(e.to_string()))
}

enum Outcome {
    Handled,
    HandlerFailed,
    Undecodable,
}

async fn consume<E, H>(
    routing_keys: Vec<String>,
    mut deliveries: DeliveryStream,
    handler: Arc<H>,
    stats: watch::Sender<SubscriptionStats>,
) where
    E: DeserializeOwned + Send + 'static,
    H: EventHandler<E> + 'static,
{
    while let Some(next) = deliveries.next().await {
        let delivery = match next {
            Ok(delivery) => delivery,
            Err(e) => {
                warn!(error = %e, routing_keys = ?routing_keys, "Failed to receive message");
                continue;
            }
        };
        stats.send_modify(|s| s.received += 1);

        let routing_key = delivery.routing_key.clone();
        let outcome = match serde_json::from_slice::<E>(&delivery.payload) {
            Err(e) => {
                warn!(
                    error = %e,
                    routing_key = %routing_key,
                    size = delivery.payload.len(),
                    "Dropping undecodable message"
                );
                Outcome::Undecodable
            }
            Ok(event) => match AssertUnwindSafe(handler.handle(event))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => Outcome::Handled,
                Ok(Err(e)) => {
                    error!(error = %e, routing_key = %routing_key, "Event handler failed");
                    Outcome::HandlerFailed
                }
                Err(panic) => {
                    error!(
                        panic = %panic_message(panic.as_ref()),
                        routing_key = %routing_key,
                        "Event handler panicked"
                    );
                    Outcome::HandlerFailed
                }
            },
        };

        let acked = match delivery.ack().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, routing_key = %routing_key, "Failed to acknowledge message");
                false
            }
        };

        stats.send_modify(|s| {
            match outcome {
                Outcome::Handled => s.handled += 1,
                Outcome::HandlerFailed => s.handler_failures += 1,
                Outcome::Undecodable => s.decode_failures += 1,
            }
            if acked {
                s.acknowledged += 1;
            }
        });
        debug!(routing_key = %routing_key, "Message processed");
    }

    warn!(routing_keys = ?routing_keys, "Delivery stream ended, subscription stopped");
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
