// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Stock Invariants
//!
//! Stock is a non-negative count. Every decrement either succeeds with
//! exactly `Q - q` remaining or fails and leaves `Q` untouched, no matter
//! how many orders arrive or in which order.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use inventory_events::{
    Decimal, InMemoryCache, InMemoryProductStore, InventoryReconciler, OrderCreated, Product,
    ProductError, ProductId, ProductStore, ReconcileOutcome,
};
use proptest::prelude::*;

fn product_with(qty: u32) -> Product {
    Product {
        id: ProductId::new(),
        name: "Widget".to_string(),
        price: Decimal::ONE,
        qty,
        created_at: Utc.with_ymd_and_hms(2026, 1, 19, 12, 0, 0).unwrap(),
    }
}

proptest! {
    /// Decrement is exact on success and a no-op on failure
    #[test]
    fn prop_decrement_exact_or_untouched(stock in 0u32..10_000, ordered in 0u32..20_000) {
        let mut product = product_with(stock);

        match product.decrement_stock(ordered) {
            Ok(remaining) => {
                prop_assert!(ordered <= stock);
                prop_assert_eq!(remaining, stock - ordered);
                prop_assert_eq!(product.qty, remaining);
            }
            Err(ProductError::InsufficientStock { available, requested }) => {
                prop_assert!(ordered > stock);
                prop_assert_eq!(available, stock);
                prop_assert_eq!(requested, ordered);
                prop_assert_eq!(product.qty, stock);
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    /// has_stock agrees with whether decrement would succeed
    #[test]
    fn prop_has_stock_predicts_decrement(stock in any::<u32>(), ordered in any::<u32>()) {
        let mut product = product_with(stock);
        let predicted = product.has_stock(ordered);
        prop_assert_eq!(predicted, product.decrement_stock(ordered).is_ok());
    }

    /// Applying any sequence of orders never drives stored stock below zero,
    /// and the final quantity equals the initial one minus the applied orders
    #[test]
    fn prop_order_sequence_conserves_stock(
        stock in 0u32..500,
        orders in prop::collection::vec(0u32..100, 0..25),
    ) {
        tokio_test::block_on(async {
            let product = product_with(stock);
            let id = product.id;
            let store = InMemoryProductStore::with_products([product]);
            let reconciler =
                InventoryReconciler::new(Arc::new(store.clone()), Arc::new(InMemoryCache::default()));

            let mut applied = 0u32;
            for qty in orders {
                let outcome = reconciler
                    .on_order_created(&OrderCreated::new(id, qty))
                    .await
                    .unwrap();
                match outcome {
                    ReconcileOutcome::Applied { remaining, .. } => {
                        applied += qty;
                        prop_assert_eq!(remaining, stock - applied);
                    }
                    ReconcileOutcome::InsufficientStock { available, requested, .. } => {
                        prop_assert!(requested > available);
                        prop_assert_eq!(available, stock - applied);
                    }
                    ReconcileOutcome::UnknownProduct { .. } => {
                        prop_assert!(false, "product vanished from the store");
                    }
                }
            }

            let stored = store.find_by_id(id).await.unwrap().unwrap();
            prop_assert_eq!(stored.qty, stock - applied);
            Ok(())
        })?;
    }
}
