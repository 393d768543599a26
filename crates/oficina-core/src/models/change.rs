//! Sync queue entry model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::{EntityKind, LocalId};

/// Kind of locally-originated mutation awaiting transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

impl ChangeOp {
    /// Stable name used in the sync queue's `op` column
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl FromStr for ChangeOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!("unknown change op: {other}"))),
        }
    }
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A durable sync queue entry recording one local mutation
///
/// Created by the change recorder at mutation time, mutated only by the
/// push phase (`synced`/`last_error`), removed by compaction once synced.
/// Entries are processed in `(created_at, id)` ascending order so edits to
/// the same row replay in causal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    /// Queue rowid (SQLite autoincrement)
    pub id: i64,
    /// Entity table the change targets
    pub entity: EntityKind,
    /// Mutation kind
    pub op: ChangeOp,
    /// Local id of the targeted record
    pub local_id: LocalId,
    /// JSON snapshot taken at enqueue time: the full payload for inserts
    /// and updates, the remote-key snapshot for deletes
    pub payload: Option<String>,
    /// Enqueue timestamp (Unix ms)
    pub created_at: i64,
    /// Whether the entry has been applied remotely
    pub synced: bool,
    /// Error message from the most recent failed push attempt
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_op_roundtrips_through_string() {
        for op in [ChangeOp::Insert, ChangeOp::Update, ChangeOp::Delete] {
            let parsed: ChangeOp = op.as_str().parse().unwrap();
            assert_eq!(op, parsed);
        }
    }

    #[test]
    fn change_op_rejects_unknown_names() {
        assert!("upsert".parse::<ChangeOp>().is_err());
    }
}
