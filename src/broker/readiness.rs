// Copyright (c) 2025 - Cowboy AI, Inc.
//! Readiness gate for the broker connection
//!
//! Publishers and subscribers call [`ReadinessGate::wait`] before touching
//! the transport. The gate is a `watch` channel over [`ConnectionState`] plus
//! a set-once outcome: the single terminal transition (`Ready` or `Failed`)
//! wakes every waiter at once, and later waiters return immediately.

use std::sync::{Arc, OnceLock};

use tokio::sync::watch;
use tracing::debug;

use super::Transport;
use crate::errors::{BrokerError, BrokerResult};
use crate::state_machine::{ConnectionEvent, ConnectionState, StateMachine};

type Outcome = Result<Arc<dyn Transport>, BrokerError>;

/// Resolves exactly once per connection instance
pub struct ReadinessGate {
    state: watch::Sender<ConnectionState>,
    outcome: OnceLock<Outcome>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            state,
            outcome: OnceLock::new(),
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Whether the gate has resolved
    pub fn is_resolved(&self) -> bool {
        self.outcome.get().is_some()
    }

    /// Move `Disconnected → Connecting`
    pub(crate) fn begin(&self) -> BrokerResult<()> {
        self.advance(ConnectionEvent::Dial)
    }

    /// Resolve the gate as `Ready`, releasing every waiter with `transport`
    pub(crate) fn open(&self, transport: Arc<dyn Transport>) -> BrokerResult<()> {
        self.resolve(ConnectionEvent::Established, Ok(transport))
    }

    /// Resolve the gate as `Failed`, releasing every waiter with `error`
    pub(crate) fn fail(&self, error: BrokerError) -> BrokerResult<()> {
        self.resolve(ConnectionEvent::Exhausted, Err(error))
    }

    /// Suspend until the gate resolves
    ///
    /// Returns the shared transport once `Ready`, or the terminal error once
    /// `Failed`.
    pub async fn wait(&self) -> BrokerResult<Arc<dyn Transport>> {
        if let Some(outcome) = self.outcome.get() {
            return outcome.clone();
        }

        let mut receiver = self.state.subscribe();
        receiver
            .wait_for(|state| state.is_terminal())
            .await
            .map_err(|_| BrokerError::InvalidState("readiness gate dropped".to_string()))?;

        self.outcome.get().cloned().unwrap_or_else(|| {
            Err(BrokerError::InvalidState(
                "terminal state without outcome".to_string(),
            ))
        })
    }

    fn resolve(&self, input: ConnectionEvent, outcome: Outcome) -> BrokerResult<()> {
        let (next, ()) = self.state().transition(&input)?;

        if self.outcome.set(outcome).is_err() {
            return Err(BrokerError::InvalidState(
                "readiness gate already resolved".to_string(),
            ));
        }

        self.state.send_replace(next);
        debug!(state = %next, "Readiness gate resolved");
        Ok(())
    }

    fn advance(&self, input: ConnectionEvent) -> BrokerResult<()> {
        let mut result = Ok(());
        self.state.send_if_modified(|state| match state.transition(&input) {
            Ok((next, ())) => {
                *state = next;
                true
            }
            Err(e) => {
                result = Err(BrokerError::from(e));
                false
            }
        });
        result
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}
