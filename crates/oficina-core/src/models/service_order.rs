//! Service order model

use serde::{Deserialize, Serialize};

use crate::models::LocalId;

/// Lifecycle status of a service order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    InProgress,
    Completed,
    Delivered,
    Canceled,
}

/// A service order tying a customer and vehicle to work performed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOrder {
    /// Customer's local id
    pub customer_id: LocalId,
    /// Vehicle's local id
    pub vehicle_id: LocalId,
    /// Assigned mechanic's local id, if any
    #[serde(default)]
    pub mechanic_id: Option<LocalId>,
    /// Current status
    pub status: OrderStatus,
    /// When the order was opened (Unix ms)
    pub opened_at: i64,
    /// When the order was closed (Unix ms)
    #[serde(default)]
    pub closed_at: Option<i64>,
    /// Total in cents (parts + labor)
    pub total_cents: i64,
    /// Free-form notes from intake or the mechanic
    #[serde(default)]
    pub notes: Option<String>,
}

impl ServiceOrder {
    /// Open a new order for the given customer and vehicle
    #[must_use]
    pub fn open(customer_id: LocalId, vehicle_id: LocalId) -> Self {
        Self {
            customer_id,
            vehicle_id,
            mechanic_id: None,
            status: OrderStatus::Open,
            opened_at: chrono::Utc::now().timestamp_millis(),
            closed_at: None,
            total_cents: 0,
            notes: None,
        }
    }
}
