// Copyright (c) 2025 - Cowboy AI, Inc.
//! Order events consumed by the product side

use serde::{Deserialize, Serialize};

use super::DomainEvent;
use crate::domain::ProductId;

/// An order was placed for `qty` units of a product
///
/// ```json
/// { "orderId": "9b2c…", "productId": "01934f4a-…", "qty": 2 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    /// Order identifier assigned by the order service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,

    /// Product whose stock must be reduced
    pub product_id: ProductId,

    /// Units ordered
    pub qty: u32,
}

impl OrderCreated {
    pub fn new(product_id: ProductId, qty: u32) -> Self {
        Self {
            order_id: None,
            product_id,
            qty,
        }
    }

    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }
}

impl DomainEvent for OrderCreated {
    const ROUTING_KEY: &'static str = "order.created";
}
