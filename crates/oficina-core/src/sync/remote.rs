//! Remote store collaborator contract

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{EntityKind, EntityPayload, LocalId, RemoteId, RemoteRecord};

/// Key used to address a row on the remote store
///
/// Rows that have round-tripped carry a remote id; rows that have not are
/// addressed by their local id as a fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteKey {
    Remote(RemoteId),
    Local(LocalId),
}

/// Request/response interface to the authoritative remote store
///
/// Failures are opaque to the engine: implementations should map network,
/// validation, and not-found conditions to [`crate::Error::Remote`] so the
/// push phase can record them per entry and retry later.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create a row remotely; returns the remote-assigned identifier
    ///
    /// The local id travels with the payload so later pulls can echo it
    /// back and reconcile with a row whose id write-back never landed.
    async fn insert(&self, local_id: &LocalId, payload: &EntityPayload) -> Result<RemoteId>;

    /// Replace a row's fields remotely
    async fn update(&self, kind: EntityKind, key: &RemoteKey, payload: &EntityPayload)
        -> Result<()>;

    /// Delete a row remotely
    async fn delete(&self, kind: EntityKind, key: &RemoteKey) -> Result<()>;

    /// Fetch up to `limit` of the most recently updated rows for a table
    async fn list_recent(&self, kind: EntityKind, limit: u32) -> Result<Vec<RemoteRecord>>;
}
