// Copyright (c) 2025 - Cowboy AI, Inc.
//! Product entity with stock invariants

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Product validation and invariant errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProductError {
    #[error("Product name is empty")]
    EmptyName,

    #[error("Product price must be non-negative: {0}")]
    InvalidPrice(Decimal),

    #[error("Insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: u32, requested: u32 },

    #[error("Stock overflow: {current} + {added}")]
    StockOverflow { current: u32, added: u32 },

    #[error("Invalid product id: {0}")]
    InvalidId(String),
}

/// Opaque unique product identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(Uuid);

impl ProductId {
    /// Generate a new time-ordered id
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProductId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProductId {
    type Err = ProductError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ProductError::InvalidId(s.to_string()))
    }
}

/// Durable product record
///
/// Serialized in camelCase, the shape other services already consume
/// from `product.created` and from the cache. `price` travels as a decimal
/// string (`"19.99"`), never as a JSON float.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    pub qty: u32,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Build a new product from validated input
    pub fn create(input: NewProduct) -> Result<Self, ProductError> {
        let name = validate_name(input.name)?;
        let price = validate_price(input.price)?;

        Ok(Self {
            id: ProductId::new(),
            name,
            price,
            qty: input.qty,
            created_at: Utc::now(),
        })
    }

    /// Whether `requested` units can be taken without going negative
    pub fn has_stock(&self, requested: u32) -> bool {
        self.qty >= requested
    }

    /// Remove `requested` units from stock
    ///
    /// Returns the remaining quantity. Leaves the product untouched when
    /// stock is insufficient.
    pub fn decrement_stock(&mut self, requested: u32) -> Result<u32, ProductError> {
        let remaining = self
            .qty
            .checked_sub(requested)
            .ok_or(ProductError::InsufficientStock {
                available: self.qty,
                requested,
            })?;
        self.qty = remaining;
        Ok(remaining)
    }

    /// Add `added` units to stock
    pub fn increment_stock(&mut self, added: u32) -> Result<u32, ProductError> {
        let total = self
            .qty
            .checked_add(added)
            .ok_or(ProductError::StockOverflow {
                current: self.qty,
                added,
            })?;
        self.qty = total;
        Ok(total)
    }

    /// Apply a partial update, validating every provided field first
    pub fn apply(&mut self, update: ProductUpdate) -> Result<(), ProductError> {
        let name = update.name.map(validate_name).transpose()?;
        let price = update.price.map(validate_price).transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(price) = price {
            self.price = price;
        }
        if let Some(qty) = update.qty {
            self.qty = qty;
        }
        Ok(())
    }
}

/// Input for creating a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Decimal,
    pub qty: u32,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price: Decimal, qty: u32) -> Self {
        Self {
            name: name.into(),
            price,
            qty,
        }
    }
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub qty: Option<u32>,
}

fn validate_name(name: String) -> Result<String, ProductError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ProductError::EmptyName);
    }
    Ok(trimmed.to_string())
}

fn validate_price(price: Decimal) -> Result<Decimal, ProductError> {
    if price < Decimal::ZERO {
        return Err(ProductError::InvalidPrice(price));
    }
    Ok(price)
}
