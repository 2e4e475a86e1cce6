// Copyright (c) 2025 - Cowboy AI, Inc.

//! Routing keys and their NATS subjects
//!
//! Events are routed by dot-segmented routing keys of the form
//!
//! ```text
//! {entity}.{operation}
//! ```
//!
//! Every key lives under the exchange's subject namespace on the wire:
//!
//! ```text
//! {exchange}.{entity}.{operation}      e.g. events.order.created
//! ```
//!
//! Binding patterns may use the NATS wildcards:
//! - `*` matches exactly one token (`order.*`)
//! - `>` matches one or more trailing tokens (`product.>`)
//!
//! # Examples
//!
//! ```rust
//! use inventory_events::subjects::{self, EntityType, Operation};
//!
//! let key = subjects::routing_key(EntityType::Order, Operation::Created);
//! assert_eq!(key, "order.created");
//! assert_eq!(subjects::subject_for("events", &key), "events.order.created");
//! assert!(subjects::matches("order.*", "order.created"));
//! ```

use std::fmt;

/// Default exchange all domain events are published to
pub const DEFAULT_EXCHANGE: &str = "events";

/// Single-token wildcard
pub const WILDCARD_TOKEN: &str = "*";

/// Trailing multi-token wildcard
pub const WILDCARD_TAIL: &str = ">";

/// Entity types that emit or consume events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    /// Orders placed by the order service
    Order,
    /// Catalog products owned by the product service
    Product,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Order => write!(f, "order"),
            EntityType::Product => write!(f, "product"),
        }
    }
}

/// Operations (event kinds) on an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// The entity was created
    Created,
    /// The entity was updated
    Updated,
    /// The entity was deleted
    Deleted,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Created => write!(f, "created"),
            Operation::Updated => write!(f, "updated"),
            Operation::Deleted => write!(f, "deleted"),
        }
    }
}

/// Why a routing key or binding pattern was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingKeyError {
    #[error("routing key is empty")]
    Empty,

    #[error("routing key '{0}' has an empty segment")]
    EmptySegment(String),

    #[error("routing key '{0}' contains whitespace")]
    Whitespace(String),

    #[error("routing key '{0}' contains wildcards")]
    Wildcard(String),

    #[error("'>' must be the last segment in '{0}'")]
    MisplacedTail(String),
}

/// Build the routing key for an entity operation
pub fn routing_key(entity: EntityType, operation: Operation) -> String {
    format!("{}.{}", entity, operation)
}

/// Binding pattern for every operation on an entity: `{entity}.>`
pub fn entity_wildcard(entity: EntityType) -> String {
    format!("{}.{}", entity, WILDCARD_TAIL)
}

/// Wire subject for a routing key on an exchange
pub fn subject_for(exchange: &str, routing_key: &str) -> String {
    format!("{}.{}", exchange, routing_key)
}

/// Subjects captured by an exchange: `{exchange}.>`
pub fn exchange_subjects(exchange: &str) -> String {
    subject_for(exchange, WILDCARD_TAIL)
}

/// Strip the exchange prefix from a wire subject
pub fn routing_key_of<'a>(exchange: &str, subject: &'a str) -> Option<&'a str> {
    subject
        .strip_prefix(exchange)
        .and_then(|rest| rest.strip_prefix('.'))
        .filter(|key| !key.is_empty())
}

/// Validate a concrete routing key (as used for publishing)
pub fn validate_routing_key(key: &str) -> Result<(), RoutingKeyError> {
    validate(key)?;
    if key
        .split('.')
        .any(|token| token == WILDCARD_TOKEN || token == WILDCARD_TAIL)
    {
        return Err(RoutingKeyError::Wildcard(key.to_string()));
    }
    Ok(())
}

/// Validate a binding pattern (wildcards allowed)
pub fn validate_pattern(pattern: &str) -> Result<(), RoutingKeyError> {
    validate(pattern)?;
    let tokens: Vec<&str> = pattern.split('.').collect();
    if let Some(position) = tokens.iter().position(|token| *token == WILDCARD_TAIL) {
        if position != tokens.len() - 1 {
            return Err(RoutingKeyError::MisplacedTail(pattern.to_string()));
        }
    }
    Ok(())
}

fn validate(key: &str) -> Result<(), RoutingKeyError> {
    if key.is_empty() {
        return Err(RoutingKeyError::Empty);
    }
    if key.chars().any(char::is_whitespace) {
        return Err(RoutingKeyError::Whitespace(key.to_string()));
    }
    if key.split('.').any(str::is_empty) {
        return Err(RoutingKeyError::EmptySegment(key.to_string()));
    }
    Ok(())
}

/// Topic match of a routing key against a binding pattern
pub fn matches(pattern: &str, key: &str) -> bool {
    let mut pattern_tokens = pattern.split('.');
    let mut key_tokens = key.split('.');

    loop {
        match (pattern_tokens.next(), key_tokens.next()) {
            (Some(WILDCARD_TAIL), Some(_)) => return true,
            (Some(WILDCARD_TOKEN), Some(_)) => continue,
            (Some(expected), Some(actual)) if expected == actual => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Whether every key matched by `specific` is also matched by `general`
pub fn covers(general: &str, specific: &str) -> bool {
    let mut general_tokens = general.split('.');
    let mut specific_tokens = specific.split('.');

    loop {
        match (general_tokens.next(), specific_tokens.next()) {
            (Some(WILDCARD_TAIL), Some(_)) => return true,
            (Some(WILDCARD_TOKEN), Some(token)) if token != WILDCARD_TAIL => continue,
            (Some(expected), Some(actual)) if expected == actual => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Drop patterns already covered by another pattern in the set
///
/// A queue bound with both `order.*` and `order.created` receives each
/// `order.created` message once; the collapsed set gives the same
/// coverage without overlapping filters. First-seen order is kept.
pub fn collapse_patterns(patterns: &[String]) -> Vec<String> {
    let mut kept: Vec<String> = Vec::new();
    for pattern in patterns {
        if kept.iter().any(|existing| covers(existing, pattern)) {
            continue;
        }
        kept.retain(|existing| !covers(pattern, existing));
        kept.push(pattern.clone());
    }
    kept
}

/// Routing keys used across the product and order services
pub mod keys {
    use super::*;

    pub fn order_created() -> String {
        routing_key(EntityType::Order, Operation::Created)
    }

    pub fn product_created() -> String {
        routing_key(EntityType::Product, Operation::Created)
    }

    pub fn all_product_events() -> String {
        entity_wildcard(EntityType::Product)
    }
}
