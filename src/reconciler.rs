// Copyright (c) 2025 - Cowboy AI, Inc.
//! Inventory reconciliation
//!
//! Applies `order.created` events to product stock:
//!
//! 1. Read the product from the durable store.
//! 2. Unknown product: warn, discard.
//! 3. Stock below the ordered quantity: warn, discard, no mutation.
//! 4. Otherwise decrement, save, and invalidate the cached copy.
//!
//! The read-check-write sequence is not atomic. It relies on the subscriber
//! handling one message at a time; running several reconcilers against the
//! same queue would need a versioned write to avoid lost updates.
//!
//! Processing is not idempotent: a redelivered event decrements again.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::cache::{self, CacheStore};
use crate::domain::ProductId;
use crate::events::OrderCreated;
use crate::store::{ProductStore, StoreError};
use crate::subscriber::EventHandler;

/// What a reconciliation did with one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Stock decremented and persisted
    Applied { product_id: ProductId, remaining: u32 },
    /// No such product; event discarded
    UnknownProduct { product_id: ProductId },
    /// Not enough stock; event discarded, product untouched
    InsufficientStock {
        product_id: ProductId,
        available: u32,
        requested: u32,
    },
}

/// Keeps product stock in step with placed orders
#[derive(Clone)]
pub struct InventoryReconciler {
    store: Arc<dyn ProductStore>,
    cache: Arc<dyn CacheStore>,
}

impl InventoryReconciler {
    pub fn new(store: Arc<dyn ProductStore>, cache: Arc<dyn CacheStore>) -> Self {
        Self { store, cache }
    }

    /// Apply one order to stock
    ///
    /// # Errors
    ///
    /// Only store failures. Unknown products and insufficient stock are
    /// expected outcomes, not errors.
    pub async fn on_order_created(
        &self,
        order: &OrderCreated,
    ) -> Result<ReconcileOutcome, StoreError> {
        let product_id = order.product_id;

        let Some(mut product) = self.store.find_by_id(product_id).await? else {
            warn!(
                product_id = %product_id,
                order_id = ?order.order_id,
                "Order references unknown product, discarding"
            );
            return Ok(ReconcileOutcome::UnknownProduct { product_id });
        };

        let remaining = match product.decrement_stock(order.qty) {
            Ok(remaining) => remaining,
            Err(e) => {
                warn!(
                    error = %e,
                    product_id = %product_id,
                    order_id = ?order.order_id,
                    "Insufficient stock, discarding order"
                );
                return Ok(ReconcileOutcome::InsufficientStock {
                    product_id,
                    available: product.qty,
                    requested: order.qty,
                });
            }
        };

        self.store.save(&product).await?;

        let key = cache::product_key(product_id);
        if let Err(e) = self.cache.invalidate(&key).await {
            warn!(error = %e, key = %key, "Cache invalidation failed, stale entry expires by TTL");
        }

        info!(
            product_id = %product_id,
            order_id = ?order.order_id,
            qty = order.qty,
            remaining,
            "Stock decremented"
        );
        Ok(ReconcileOutcome::Applied {
            product_id,
            remaining,
        })
    }
}

#[async_trait]
impl EventHandler<OrderCreated> for InventoryReconciler {
    async fn handle(&self, event: OrderCreated) -> anyhow::Result<()> {
        self.on_order_created(&event).await?;
        Ok(())
    }
}
