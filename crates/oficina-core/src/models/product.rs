//! Product model

use serde::{Deserialize, Serialize};

/// A stocked product (parts, fluids, consumables)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Display name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Unit price in cents
    pub price_cents: i64,
    /// Units in stock
    pub stock: i64,
}

impl Product {
    /// Create a product with a name and unit price
    #[must_use]
    pub fn new(name: impl Into<String>, price_cents: i64) -> Self {
        Self {
            name: name.into(),
            description: None,
            price_cents,
            stock: 0,
        }
    }
}
