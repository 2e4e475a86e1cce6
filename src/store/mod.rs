// Copyright (c) 2025 - Cowboy AI, Inc.
//! Durable product store
//!
//! The system of record for products. The real store (schema, query
//! engine, transport) lives outside this crate; everything here talks to
//! it through [`ProductStore`]. Each call is assumed atomic on its own, and
//! no transaction spans calls.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Product, ProductId};

pub use memory::InMemoryProductStore;

/// Errors from the durable store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Another product already uses this name
    #[error("Product name already exists: {0}")]
    DuplicateName(String),

    /// The store could not serve the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for product records
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn find_by_id(&self, id: ProductId) -> StoreResult<Option<Product>>;

    /// Every product, ordered by id
    async fn find_all(&self) -> StoreResult<Vec<Product>>;

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Product>>;

    /// Insert or replace the record with the product's id
    async fn save(&self, product: &Product) -> StoreResult<()>;

    /// Remove a record; `false` if it did not exist
    async fn delete(&self, id: ProductId) -> StoreResult<bool>;
}
