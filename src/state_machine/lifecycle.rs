// Copyright (c) 2025 - Cowboy AI, Inc.
//! Connection and subscription lifecycles
//!
//! # Connection
//!
//! ```text
//! Disconnected --Dial--> Connecting --Established--> Ready
//!                             |
//!                             +------Exhausted-----> Failed
//! ```
//!
//! `Ready` and `Failed` are terminal for a connection instance. A failed
//! connection is never revived; a new instance must be built to try again.
//!
//! # Subscription
//!
//! ```text
//! Unbound --Bind--> Bound --StartConsuming--> Consuming
//! ```

use std::fmt;

use super::{StateMachine, TransitionError, TransitionResult};

/// Broker connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Nothing attempted yet
    Disconnected,
    /// Dial attempts in progress
    Connecting,
    /// Transport established and exchange declared
    Ready,
    /// Retry budget exhausted or fatal configuration error
    Failed,
}

/// Inputs driving the connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Start dialing
    Dial,
    /// Dial and exchange declaration succeeded
    Established,
    /// No further attempts will be made
    Exhausted,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Ready => write!(f, "ready"),
            ConnectionState::Failed => write!(f, "failed"),
        }
    }
}

impl StateMachine for ConnectionState {
    type Input = ConnectionEvent;
    type Output = ();

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use ConnectionEvent::*;
        use ConnectionState::*;

        match (self, input) {
            (Disconnected, Dial) => Ok((Connecting, ())),
            (Connecting, Established) => Ok((Ready, ())),
            (Connecting, Exhausted) => Ok((Failed, ())),
            (Ready | Failed, _) => Err(TransitionError::Terminal(self.to_string())),
            (from, input) => Err(TransitionError::InvalidTransition {
                from: from.to_string(),
                input: format!("{input:?}"),
            }),
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Ready | ConnectionState::Failed)
    }
}

/// Subscription state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionState {
    /// Queue not yet bound
    Unbound,
    /// Queue bound to its routing keys
    Bound,
    /// Consumption loop running
    Consuming,
}

/// Inputs driving the subscription lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionEvent {
    /// Queue declared and bound
    Bind,
    /// Consumption loop spawned
    StartConsuming,
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionState::Unbound => write!(f, "unbound"),
            SubscriptionState::Bound => write!(f, "bound"),
            SubscriptionState::Consuming => write!(f, "consuming"),
        }
    }
}

impl StateMachine for SubscriptionState {
    type Input = SubscriptionEvent;
    type Output = ();

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use SubscriptionEvent::*;
        use SubscriptionState::*;

        match (self, input) {
            (Unbound, Bind) => Ok((Bound, ())),
            (Bound, StartConsuming) => Ok((Consuming, ())),
            (Consuming, _) => Err(TransitionError::Terminal(self.to_string())),
            (from, input) => Err(TransitionError::InvalidTransition {
                from: from.to_string(),
                input: format!("{input:?}"),
            }),
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, SubscriptionState::Consuming)
    }
}
