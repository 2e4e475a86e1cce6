// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for broker operations

use thiserror::Error;

use crate::state_machine::TransitionError;

/// Errors that can occur while talking to the message broker
///
/// Every variant carries owned strings so the terminal outcome of a
/// connection can be cloned out to every task waiting on readiness.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// A single dial attempt failed
    #[error("Broker unreachable: {0}")]
    Unreachable(String),

    /// Every dial attempt allowed by the retry policy failed
    #[error("Broker connection failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// The exchange already exists with different parameters
    #[error("Exchange '{name}' already declared with different parameters: {reason}")]
    ExchangeMismatch { name: String, reason: String },

    /// Publish or bind against an exchange that was never declared
    #[error("Unknown exchange: {0}")]
    UnknownExchange(String),

    /// The connection reached `Failed`; carries the original cause
    #[error("Broker connection failed: {0}")]
    ConnectionFailed(String),

    /// Operation not allowed in the current connection state
    #[error("Invalid connection state: {0}")]
    InvalidState(String),

    /// Retry policy or exchange settings are unusable
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Transport-level failure on an established connection
    #[error("Transport error: {0}")]
    Transport(String),

    /// Acknowledgement could not be delivered to the broker
    #[error("Acknowledge error: {0}")]
    Ack(String),
}

/// Result type for broker operations
pub type BrokerResult<T> = Result<T, BrokerError>;

impl BrokerError {
    /// Whether another dial attempt could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, BrokerError::Unreachable(_) | BrokerError::Transport(_))
    }
}

impl From<TransitionError> for BrokerError {
    fn from(err: TransitionError) -> Self {
        BrokerError::InvalidState(err.to_string())
    }
}

impl From<async_nats::ConnectError> for BrokerError {
    fn from(err: async_nats::ConnectError) -> Self {
        BrokerError::Unreachable(err.to_string())
    }
}
