//! Vehicle model

use serde::{Deserialize, Serialize};

use crate::models::LocalId;

/// A customer's vehicle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Owning customer's local id
    #[serde(default)]
    pub customer_id: Option<LocalId>,
    /// License plate
    pub plate: String,
    /// Manufacturer
    #[serde(default)]
    pub brand: Option<String>,
    /// Model name
    #[serde(default)]
    pub model: Option<String>,
    /// Model year
    #[serde(default)]
    pub year: Option<i32>,
    /// Color
    #[serde(default)]
    pub color: Option<String>,
}

impl Vehicle {
    /// Create a vehicle with just a plate
    #[must_use]
    pub fn new(plate: impl Into<String>) -> Self {
        Self {
            customer_id: None,
            plate: plate.into(),
            brand: None,
            model: None,
            year: None,
            color: None,
        }
    }
}
