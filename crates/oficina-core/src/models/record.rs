//! Local record identity and the typed entity payload union

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Customer, Mechanic, Product, ServiceItem, ServiceOrder, Vehicle};

/// A locally-assigned record identifier, using UUID v7 (time-sortable)
///
/// Stable for the life of the local row, independent of whether the row
/// has been accepted remotely yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalId(Uuid);

impl LocalId {
    /// Create a new unique local ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for LocalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LocalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// An identifier assigned by the remote store once a row has been accepted
///
/// Opaque to this crate; it is only used as the join key when reconciling
/// pulled rows with existing local rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteId(String);

impl RemoteId {
    /// Wrap a remote-assigned identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RemoteId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The set of entity tables tracked by the local store and the sync engine
///
/// Dispatch on this enum (rather than table-name strings) keeps every
/// match exhaustive when a new entity is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Customer,
    Vehicle,
    Mechanic,
    Product,
    ServiceItem,
    ServiceOrder,
}

impl EntityKind {
    /// All tracked entity kinds, in pull order
    pub const ALL: [Self; 6] = [
        Self::Customer,
        Self::Vehicle,
        Self::Mechanic,
        Self::Product,
        Self::ServiceItem,
        Self::ServiceOrder,
    ];

    /// The local SQLite table backing this entity kind
    #[must_use]
    pub const fn table(&self) -> &'static str {
        match self {
            Self::Customer => "customers",
            Self::Vehicle => "vehicles",
            Self::Mechanic => "mechanics",
            Self::Product => "products",
            Self::ServiceItem => "service_items",
            Self::ServiceOrder => "service_orders",
        }
    }

    /// Stable name used in the sync queue's `entity` column
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Vehicle => "vehicle",
            Self::Mechanic => "mechanic",
            Self::Product => "product",
            Self::ServiceItem => "service_item",
            Self::ServiceOrder => "service_order",
        }
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "customer" => Ok(Self::Customer),
            "vehicle" => Ok(Self::Vehicle),
            "mechanic" => Ok(Self::Mechanic),
            "product" => Ok(Self::Product),
            "service_item" => Ok(Self::ServiceItem),
            "service_order" => Ok(Self::ServiceOrder),
            other => Err(Error::InvalidInput(format!("unknown entity kind: {other}"))),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain payload for one tracked entity, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityPayload {
    Customer(Customer),
    Vehicle(Vehicle),
    Mechanic(Mechanic),
    Product(Product),
    ServiceItem(ServiceItem),
    ServiceOrder(ServiceOrder),
}

impl EntityPayload {
    /// The entity kind this payload belongs to
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Customer(_) => EntityKind::Customer,
            Self::Vehicle(_) => EntityKind::Vehicle,
            Self::Mechanic(_) => EntityKind::Mechanic,
            Self::Product(_) => EntityKind::Product,
            Self::ServiceItem(_) => EntityKind::ServiceItem,
            Self::ServiceOrder(_) => EntityKind::ServiceOrder,
        }
    }

    /// Serialize the inner domain fields to a JSON string.
    ///
    /// The kind tag is not stored; the surrounding table or queue column
    /// already carries it.
    pub fn to_json(&self) -> Result<String> {
        let json = match self {
            Self::Customer(inner) => serde_json::to_string(inner)?,
            Self::Vehicle(inner) => serde_json::to_string(inner)?,
            Self::Mechanic(inner) => serde_json::to_string(inner)?,
            Self::Product(inner) => serde_json::to_string(inner)?,
            Self::ServiceItem(inner) => serde_json::to_string(inner)?,
            Self::ServiceOrder(inner) => serde_json::to_string(inner)?,
        };
        Ok(json)
    }

    /// Deserialize domain fields for the given kind from a JSON string
    pub fn from_json(kind: EntityKind, json: &str) -> Result<Self> {
        let payload = match kind {
            EntityKind::Customer => Self::Customer(serde_json::from_str(json)?),
            EntityKind::Vehicle => Self::Vehicle(serde_json::from_str(json)?),
            EntityKind::Mechanic => Self::Mechanic(serde_json::from_str(json)?),
            EntityKind::Product => Self::Product(serde_json::from_str(json)?),
            EntityKind::ServiceItem => Self::ServiceItem(serde_json::from_str(json)?),
            EntityKind::ServiceOrder => Self::ServiceOrder(serde_json::from_str(json)?),
        };
        Ok(payload)
    }
}

/// A row in one of the tracked local tables
///
/// Invariant: `synced == true` implies `remote_id` is present. A row with
/// `synced == false` may still carry a remote id when it exists remotely
/// but has a newer unsynced local edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalRecord {
    /// Locally-assigned identifier, stable for the life of the row
    pub local_id: LocalId,
    /// Remote identifier, set once the row has been accepted remotely
    pub remote_id: Option<RemoteId>,
    /// Whether the row's current state is known to the remote store
    pub synced: bool,
    /// Domain fields
    pub payload: EntityPayload,
    /// Last local write timestamp (Unix ms)
    pub updated_at: i64,
}

impl LocalRecord {
    /// Create a fresh, unsynced local record for the given payload
    #[must_use]
    pub fn new(payload: EntityPayload) -> Self {
        Self {
            local_id: LocalId::new(),
            remote_id: None,
            synced: false,
            payload,
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// The entity kind of this record's payload
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.payload.kind()
    }
}

/// A row as returned by the remote store during a pull
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRecord {
    /// Remote-assigned identifier
    pub remote_id: RemoteId,
    /// Originating local id echoed back by the remote, when it has one.
    /// Lets a pull reconcile with a local row that never round-tripped.
    pub local_id: Option<LocalId>,
    /// Domain fields as the remote store last saw them
    pub payload: EntityPayload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Customer;
    use pretty_assertions::assert_eq;

    #[test]
    fn local_id_roundtrips_through_string() {
        let id = LocalId::new();
        let parsed: LocalId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn entity_kind_roundtrips_through_string() {
        for kind in EntityKind::ALL {
            let parsed: EntityKind = kind.as_str().parse().unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn entity_kind_rejects_unknown_names() {
        assert!("invoice".parse::<EntityKind>().is_err());
    }

    #[test]
    fn payload_json_roundtrip_preserves_fields() {
        let payload = EntityPayload::Customer(Customer {
            name: "Ana".into(),
            phone: Some("11 99999-0000".into()),
            email: None,
            address: None,
        });
        let json = payload.to_json().unwrap();
        let back = EntityPayload::from_json(EntityKind::Customer, &json).unwrap();
        assert_eq!(payload, back);
    }

    #[test]
    fn new_record_starts_unsynced_without_remote_id() {
        let record = LocalRecord::new(EntityPayload::Customer(Customer::new("Ana")));
        assert!(!record.synced);
        assert!(record.remote_id.is_none());
        assert_eq!(record.kind(), EntityKind::Customer);
    }
}
