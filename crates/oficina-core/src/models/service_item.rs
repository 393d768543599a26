//! Service catalog model

use serde::{Deserialize, Serialize};

/// A labor item offered by the workshop (e.g. oil change, alignment)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceItem {
    /// Display name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Labor price in cents
    pub price_cents: i64,
}

impl ServiceItem {
    /// Create a service item with a name and price
    #[must_use]
    pub fn new(name: impl Into<String>, price_cents: i64) -> Self {
        Self {
            name: name.into(),
            description: None,
            price_cents,
        }
    }
}
