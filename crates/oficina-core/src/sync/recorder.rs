//! Change recorder: turns local mutations into durable sync queue entries

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::db::{Database, LocalStore};
use crate::error::{Error, Result};
use crate::models::{ChangeOp, EntityKind, EntityPayload, LocalId, LocalRecord, RemoteId};

/// Remote key snapshot carried by a `delete` queue entry.
///
/// The local row is gone by the time the push phase runs, so the key it
/// needs is captured at enqueue time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct DeleteKey {
    pub remote_id: Option<RemoteId>,
}

/// Records every locally-originated mutation in the sync queue
///
/// The domain write and the queue append happen in one transaction, so a
/// crash can never leave a mutation without its intent to sync. Never
/// touches the network.
#[derive(Clone)]
pub struct ChangeRecorder {
    db: Arc<Mutex<Database>>,
}

impl ChangeRecorder {
    /// Create a recorder over the shared database handle
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    /// Insert a new record locally and enqueue it for push
    pub async fn record_insert(&self, payload: EntityPayload) -> Result<LocalRecord> {
        let record = LocalRecord::new(payload);
        self.in_transaction(|store| {
            store.put(&record)?;
            store.enqueue(
                record.kind(),
                ChangeOp::Insert,
                &record.local_id,
                Some(&record.payload),
            )?;
            Ok(())
        })
        .await?;
        Ok(record)
    }

    /// Apply a local edit and enqueue it for push
    ///
    /// The edited row becomes unsynced again; its remote id (if any) is
    /// kept so the push phase can address the remote row.
    pub async fn record_update(&self, mut record: LocalRecord) -> Result<LocalRecord> {
        record.synced = false;
        record.updated_at = chrono::Utc::now().timestamp_millis();
        let snapshot = record.clone();
        self.in_transaction(move |store| {
            store.put(&snapshot)?;
            store.enqueue(
                snapshot.kind(),
                ChangeOp::Update,
                &snapshot.local_id,
                Some(&snapshot.payload),
            )?;
            Ok(())
        })
        .await?;
        Ok(record)
    }

    /// Delete a record locally and enqueue the deletion for push
    pub async fn record_delete(&self, kind: EntityKind, local_id: &LocalId) -> Result<()> {
        let local_id = *local_id;
        self.in_transaction(move |store| {
            let record = store
                .get(kind, &local_id)?
                .ok_or_else(|| Error::NotFound(format!("{kind} {local_id}")))?;

            store.delete(kind, &local_id)?;

            let key = DeleteKey {
                remote_id: record.remote_id,
            };
            let key_json = serde_json::to_string(&key)?;
            store.enqueue_raw(kind, ChangeOp::Delete, &local_id, Some(&key_json))?;
            Ok(())
        })
        .await
    }

    /// Run a closure against the store inside a single transaction
    async fn in_transaction<T>(&self, f: impl FnOnce(&LocalStore<'_>) -> Result<T>) -> Result<T> {
        let db = self.db.lock().await;
        let conn = db.connection();

        conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(&LocalStore::new(conn)) {
            Ok(value) => {
                conn.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(error) => {
                conn.execute_batch("ROLLBACK").ok();
                Err(error)
            }
        }
    }
}
