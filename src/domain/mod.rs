// Copyright (c) 2025 - Cowboy AI, Inc.
//! Product Domain Model
//!
//! The durable entity the inventory reconciler keeps consistent with
//! order events.
//!
//! # Invariants
//!
//! - [`Product::qty`] never goes below zero. Operations that would violate
//!   this are rejected with [`ProductError::InsufficientStock`], never clamped.
//! - [`Product::price`] is an exact decimal and non-negative.
//! - [`Product::name`] is non-empty (uniqueness is enforced by the store).

pub mod product;

pub use product::{NewProduct, Product, ProductError, ProductId, ProductUpdate};
pub use rust_decimal::Decimal;
