// Copyright (c) 2025 - Cowboy AI, Inc.
//! Finite State Machine Abstractions
//!
//! Lifecycles in this crate (broker connections, subscriptions) are modeled
//! as pure transition functions. The owning component stores the current
//! state and applies inputs through [`StateMachine::transition`]; invalid
//! inputs are rejected rather than silently ignored.
//!
//! ```text
//! (State, Input) → (State, Output)
//! ```

pub mod lifecycle;

pub use lifecycle::{ConnectionEvent, ConnectionState, SubscriptionEvent, SubscriptionState};

/// Result of a state transition
pub type TransitionResult<S> = Result<S, TransitionError>;

/// Errors that can occur during state transitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// Transition from current state with the given input is not allowed
    #[error("Invalid transition from {from} on {input}")]
    InvalidTransition { from: String, input: String },

    /// The state is terminal and accepts no further input
    #[error("State {0} is terminal")]
    Terminal(String),
}

/// Trait for finite state machines
pub trait StateMachine: Sized + Clone {
    /// Input type that triggers transitions
    type Input;

    /// Output type produced by transitions (use () if none)
    type Output;

    /// Attempt to transition to a new state given an input
    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)>;

    /// Check if a transition is valid without performing it
    fn can_transition(&self, input: &Self::Input) -> bool {
        self.transition(input).is_ok()
    }

    /// Whether no input can move the machine out of this state
    fn is_terminal(&self) -> bool;
}
