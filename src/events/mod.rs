// Copyright (c) 2025 - Cowboy AI, Inc.
//! Integration Events
//!
//! Facts exchanged between the order and product services. Each event type
//! owns exactly one routing key, so a payload is decoded into a concrete
//! type right after it leaves the broker and handlers never see raw bytes.
//!
//! # Routing
//!
//! | Event | Routing key | Producer → Consumer |
//! |---|---|---|
//! | [`OrderCreated`] | `order.created` | order service → inventory reconciler |
//! | [`ProductCreated`] | `product.created` | product service → any subscriber |
//!
//! # Wire Format
//!
//! JSON objects with camelCase fields. There is no envelope or schema
//! registry; producer and consumer agree on the shape out of band.

pub mod order;
pub mod product;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use order::OrderCreated;
pub use product::ProductCreated;

/// A payload bound to a single routing key
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Routing key this event is published under
    const ROUTING_KEY: &'static str;

    /// Encode to the JSON wire format
    fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decode from the JSON wire format
    fn from_payload(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }
}
