// Copyright (c) 2025 - Cowboy AI, Inc.
//! Broker connection lifecycle
//!
//! [`BrokerConnection::connect`] dials through a [`Connector`], declares the
//! shared topic exchange, and resolves the [`ReadinessGate`]. Dial failures
//! are retried with the configured delay until the attempt budget runs out;
//! an exchange declaration conflict is fatal immediately.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::{Connector, ExchangeConfig, ReadinessGate, Transport};
use crate::config::RetryPolicy;
use crate::errors::{BrokerError, BrokerResult};
use crate::state_machine::ConnectionState;

/// Owns the transport handle and the exchange declaration
///
/// Construct one per process in the composition root and share it by
/// `Arc`. A connection that reached `Failed` stays failed; build a new
/// instance to try again.
pub struct BrokerConnection {
    connector: Arc<dyn Connector>,
    exchange: ExchangeConfig,
    gate: ReadinessGate,
}

impl BrokerConnection {
    pub fn new(connector: Arc<dyn Connector>, exchange: ExchangeConfig) -> Self {
        Self {
            connector,
            exchange,
            gate: ReadinessGate::new(),
        }
    }

    /// Exchange this connection declares and publishes to
    pub fn exchange(&self) -> &ExchangeConfig {
        &self.exchange
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.gate.state()
    }

    /// Suspend until the connection is `Ready` (or return its terminal error)
    pub async fn await_ready(&self) -> BrokerResult<Arc<dyn Transport>> {
        self.gate.wait().await
    }

    /// Establish the transport and declare the exchange
    ///
    /// # Errors
    ///
    /// - `InvalidState` if `connect` was already called on this instance
    /// - `Configuration` if the policy allows zero attempts
    /// - `ExchangeMismatch` if the exchange exists with other parameters
    /// - `RetriesExhausted` once every attempt failed
    ///
    /// Every error except `InvalidState` also moves the connection to
    /// `Failed` and is handed to all readiness waiters.
    pub async fn connect(&self, policy: &RetryPolicy) -> BrokerResult<()> {
        self.gate.begin()?;

        if policy.attempts == 0 {
            return self.give_up(BrokerError::Configuration(
                "retry policy allows zero connection attempts".to_string(),
            ));
        }

        let mut failures = 0u32;
        loop {
            match self.try_connect().await {
                Ok(transport) => {
                    self.gate.open(transport)?;
                    info!(
                        exchange = %self.exchange.name,
                        attempts = failures + 1,
                        "Broker connection ready"
                    );
                    return Ok(());
                }
                Err(e) if !e.is_transient() => return self.give_up(e),
                Err(e) => {
                    failures += 1;
                    if failures >= policy.attempts {
                        return self.give_up(BrokerError::RetriesExhausted {
                            attempts: failures,
                            last_error: e.to_string(),
                        });
                    }

                    let delay = policy.delay_after(failures);
                    warn!(
                        error = %e,
                        attempt = failures,
                        remaining = policy.attempts - failures,
                        delay_ms = delay.as_millis() as u64,
                        "Broker connection failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn try_connect(&self) -> BrokerResult<Arc<dyn Transport>> {
        let transport = self.connector.connect().await?;
        transport.declare_exchange(&self.exchange).await?;
        Ok(transport)
    }

    fn give_up(&self, e: BrokerError) -> BrokerResult<()> {
        error!(error = %e, exchange = %self.exchange.name, "Broker connection failed");
        self.gate.fail(e.clone())?;
        Err(e)
    }
}
