// Copyright (c) 2025 - Cowboy AI, Inc.
//! NATS JetStream transport
//!
//! # Mapping
//!
//! | Broker concept | JetStream |
//! |---|---|
//! | topic exchange `events` | stream `events` capturing `events.>` |
//! | durable exchange | file storage (memory storage otherwise) |
//! | routing key `order.created` | subject `events.order.created` |
//! | exclusive queue bound to keys | one ephemeral pull consumer filtering on all keys, `DeliverPolicy::New` |
//! | ack | `AckPolicy::Explicit` ack of the JetStream message |
//!
//! Ephemeral consumers are removed by the server once idle for
//! [`CONSUMER_INACTIVE_THRESHOLD`], which gives the auto-delete behavior
//! of an exclusive queue when the subscriber goes away.
//!
//! Bindings are collapsed before the consumer is created, so a queue bound
//! to `order.*` and `order.created` filters on `order.*` alone and sees each
//! message once. Patterns that overlap without one covering the other (such
//! as `order.*` and `*.created`) are rejected by the server at bind time.

use std::sync::Arc;
use std::time::Duration;

use async_nats::jetstream::{self, consumer, stream};
use async_nats::{Client, ConnectOptions};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tracing::{debug, info};

use super::{Acknowledger, Connector, Delivery, DeliveryStream, ExchangeConfig, Transport};
use crate::config::NatsConfig;
use crate::errors::{BrokerError, BrokerResult};
use crate::subjects;

/// Idle time after which the server deletes a subscriber's consumer
pub const CONSUMER_INACTIVE_THRESHOLD: Duration = Duration::from_secs(30);

/// Dials NATS and enables JetStream
#[derive(Debug, Clone)]
pub struct NatsConnector {
    config: NatsConfig,
}

impl NatsConnector {
    pub fn new(config: NatsConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for NatsConnector {
    async fn connect(&self) -> BrokerResult<Arc<dyn Transport>> {
        let options = ConnectOptions::new()
            .name(&self.config.name)
            .connection_timeout(self.config.connect_timeout)
            .request_timeout(Some(self.config.request_timeout));

        let client =
            async_nats::connect_with_options(self.config.servers.join(","), options).await?;

        info!(servers = ?self.config.servers, "Connected to NATS");
        Ok(Arc::new(NatsTransport::new(client)))
    }
}

/// Established NATS connection with a JetStream context
#[derive(Clone)]
pub struct NatsTransport {
    client: Client,
    jetstream: jetstream::Context,
}

impl NatsTransport {
    pub fn new(client: Client) -> Self {
        let jetstream = jetstream::new(client.clone());
        Self { client, jetstream }
    }

    /// Underlying core NATS client
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn consumer_config(exchange: &str, patterns: &[String]) -> consumer::pull::Config {
        let mut filters: Vec<String> = subjects::collapse_patterns(patterns)
            .iter()
            .map(|pattern| subjects::subject_for(exchange, pattern))
            .collect();

        // Single filters use `filter_subject`, which pre-2.10 servers understand
        let (filter_subject, filter_subjects) = if filters.len() == 1 {
            (filters.remove(0), Vec::new())
        } else {
            (String::new(), filters)
        };

        consumer::pull::Config {
            filter_subject,
            filter_subjects,
            deliver_policy: consumer::DeliverPolicy::New,
            ack_policy: consumer::AckPolicy::Explicit,
            inactive_threshold: CONSUMER_INACTIVE_THRESHOLD,
            ..Default::default()
        }
    }

    fn stream_config(exchange: &ExchangeConfig) -> stream::Config {
        stream::Config {
            name: exchange.name.clone(),
            subjects: vec![subjects::exchange_subjects(&exchange.name)],
            storage: storage_for(exchange),
            ..Default::default()
        }
    }
}

fn storage_for(exchange: &ExchangeConfig) -> stream::StorageType {
    if exchange.durable {
        stream::StorageType::File
    } else {
        stream::StorageType::Memory
    }
}

fn transport_error(e: impl std::fmt::Display) -> BrokerError {
    BrokerError::Transport(e.to_string())
}

#[async_trait]
impl Transport for NatsTransport {
    async fn declare_exchange(&self, exchange: &ExchangeConfig) -> BrokerResult<()> {
        let wanted = Self::stream_config(exchange);
        let stream = self
            .jetstream
            .get_or_create_stream(wanted.clone())
            .await
            .map_err(transport_error)?;

        let existing = &stream.cached_info().config;
        if existing.subjects != wanted.subjects {
            return Err(BrokerError::ExchangeMismatch {
                name: exchange.name.clone(),
                reason: format!("subjects {:?} != {:?}", existing.subjects, wanted.subjects),
            });
        }
        if existing.storage != wanted.storage {
            return Err(BrokerError::ExchangeMismatch {
                name: exchange.name.clone(),
                reason: format!("storage {:?} != {:?}", existing.storage, wanted.storage),
            });
        }

        debug!(exchange = %exchange.name, "JetStream stream ready");
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: Bytes,
    ) -> BrokerResult<()> {
        let subject = subjects::subject_for(exchange, routing_key);
        let ack = self
            .jetstream
            .publish(subject, payload)
            .await
            .map_err(transport_error)?;
        ack.await.map_err(transport_error)?;
        Ok(())
    }

    async fn bind_queue(
        &self,
        exchange: &str,
        patterns: &[String],
    ) -> BrokerResult<DeliveryStream> {
        let stream = self
            .jetstream
            .get_stream(exchange)
            .await
            .map_err(|_| BrokerError::UnknownExchange(exchange.to_string()))?;

        let config = Self::consumer_config(exchange, patterns);
        let consumer = stream
            .create_consumer(config)
            .await
            .map_err(transport_error)?;
        let messages = consumer.messages().await.map_err(transport_error)?;
        debug!(exchange, patterns = ?patterns, "Consumer bound");

        let prefix = exchange.to_string();
        Ok(messages
            .map(move |message| {
                message
                    .map(|message| into_delivery(&prefix, message))
                    .map_err(transport_error)
            })
            .boxed())
    }
}

fn into_delivery(exchange: &str, message: jetstream::Message) -> Delivery {
    let subject = message.subject.to_string();
    let routing_key = subjects::routing_key_of(exchange, &subject)
        .unwrap_or(&subject)
        .to_string();
    let payload = message.payload.clone();
    Delivery::new(routing_key, payload, Box::new(JetStreamAck { message }))
}

struct JetStreamAck {
    message: jetstream::Message,
}

#[async_trait]
impl Acknowledger for JetStreamAck {
    async fn ack(&self) -> BrokerResult<()> {
        self.message
            .ack()
            .await
            .map_err(|e| BrokerError::Ack(e.to_string()))
    }
}
