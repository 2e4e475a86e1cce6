// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Layer
//!
//! Application services orchestrate domain rules, the durable store, the
//! cache tier and event publishing. Domain types stay free of I/O; services
//! own the ordering of side effects.
//!
//! # Example
//!
//! ```rust,ignore
//! use inventory_events::service::ProductService;
//!
//! let service = ProductService::new(store, cache, publisher);
//! let product = service.create(NewProduct::new("Widget", Decimal::new(95, 1), 10)).await?;
//! let cached = service.get_by_id(product.id).await?;
//! ```

pub mod product;

pub use product::{ProductService, ServiceError, ServiceResult};
