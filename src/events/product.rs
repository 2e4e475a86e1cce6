// Copyright (c) 2025 - Cowboy AI, Inc.
//! Product events published by the product service

use serde::{Deserialize, Serialize};

use super::DomainEvent;
use crate::domain::Product;

/// A product was persisted for the first time
///
/// Serialized as the saved product itself, no wrapper object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductCreated(pub Product);

impl From<Product> for ProductCreated {
    fn from(product: Product) -> Self {
        Self(product)
    }
}

impl DomainEvent for ProductCreated {
    const ROUTING_KEY: &'static str = "product.created";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, NewProduct};

    #[test]
    fn test_serializes_without_wrapper() {
        let product = Product::create(NewProduct::new("Widget", Decimal::new(1999, 2), 4)).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&ProductCreated::from(product.clone()).to_payload().unwrap())
                .unwrap();

        assert_eq!(json["name"], "Widget");
        assert_eq!(json["qty"], 4);
        assert_eq!(json["price"], "19.99");
        assert_eq!(json["id"], product.id.to_string());
    }
}
