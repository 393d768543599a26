//! Mechanic model

use serde::{Deserialize, Serialize};

/// A workshop mechanic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mechanic {
    /// Display name
    pub name: String,
    /// Contact phone
    #[serde(default)]
    pub phone: Option<String>,
    /// Area of expertise (e.g. engine, electrical, bodywork)
    #[serde(default)]
    pub specialty: Option<String>,
}

impl Mechanic {
    /// Create a mechanic with just a name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: None,
            specialty: None,
        }
    }
}
