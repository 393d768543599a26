//! Customer model

use serde::{Deserialize, Serialize};

/// A workshop customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Display name
    pub name: String,
    /// Contact phone
    #[serde(default)]
    pub phone: Option<String>,
    /// Contact email
    #[serde(default)]
    pub email: Option<String>,
    /// Postal address
    #[serde(default)]
    pub address: Option<String>,
}

impl Customer {
    /// Create a customer with just a name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: None,
            email: None,
            address: None,
        }
    }
}
