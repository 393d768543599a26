//! Local store: typed entity tables plus the durable sync queue

use rusqlite::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{
    ChangeEntry, ChangeOp, EntityKind, EntityPayload, LocalId, LocalRecord, RemoteId, RemoteRecord,
};

/// Raw column values for one entity row, before payload decoding
type RawRecord = (String, Option<String>, i64, String, i64);

/// Raw column values for one queue row, before enum decoding
type RawEntry = (
    i64,
    String,
    String,
    String,
    Option<String>,
    i64,
    i64,
    Option<String>,
);

/// `SQLite`-backed storage for the tracked entity tables and the sync queue
///
/// Pure data access; no network awareness. Storage errors propagate to the
/// caller uncaught.
pub struct LocalStore<'a> {
    conn: &'a Connection,
}

impl<'a> LocalStore<'a> {
    /// Create a store over the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    // ------------------------------------------------------------------
    // Entity tables
    // ------------------------------------------------------------------

    /// Upsert a record by local id, replacing all fields wholesale
    pub fn put(&self, record: &LocalRecord) -> Result<()> {
        let table = record.kind().table();
        self.conn.execute(
            &format!(
                "INSERT INTO {table} (local_id, remote_id, synced, data, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(local_id) DO UPDATE SET
                     remote_id = excluded.remote_id,
                     synced = excluded.synced,
                     data = excluded.data,
                     updated_at = excluded.updated_at"
            ),
            params![
                record.local_id.as_str(),
                record.remote_id.as_ref().map(RemoteId::as_str),
                i32::from(record.synced),
                record.payload.to_json()?,
                record.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Fetch a record by local id
    pub fn get(&self, kind: EntityKind, id: &LocalId) -> Result<Option<LocalRecord>> {
        let table = kind.table();
        let result = self.conn.query_row(
            &format!(
                "SELECT local_id, remote_id, synced, data, updated_at
                 FROM {table} WHERE local_id = ?1"
            ),
            params![id.as_str()],
            Self::raw_record,
        );

        match result {
            Ok(raw) => Ok(Some(Self::decode_record(kind, raw)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    /// Fetch a record by remote id
    pub fn find_by_remote_id(
        &self,
        kind: EntityKind,
        remote_id: &RemoteId,
    ) -> Result<Option<LocalRecord>> {
        let table = kind.table();
        let result = self.conn.query_row(
            &format!(
                "SELECT local_id, remote_id, synced, data, updated_at
                 FROM {table} WHERE remote_id = ?1"
            ),
            params![remote_id.as_str()],
            Self::raw_record,
        );

        match result {
            Ok(raw) => Ok(Some(Self::decode_record(kind, raw)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    /// List all records of a kind, most recently updated first
    pub fn list(&self, kind: EntityKind) -> Result<Vec<LocalRecord>> {
        let table = kind.table();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT local_id, remote_id, synced, data, updated_at
             FROM {table} ORDER BY updated_at DESC"
        ))?;

        let raw_rows = stmt
            .query_map([], Self::raw_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw_rows
            .into_iter()
            .map(|raw| Self::decode_record(kind, raw))
            .collect()
    }

    /// Remove a record by local id
    pub fn delete(&self, kind: EntityKind, id: &LocalId) -> Result<()> {
        let table = kind.table();
        self.conn.execute(
            &format!("DELETE FROM {table} WHERE local_id = ?1"),
            params![id.as_str()],
        )?;
        Ok(())
    }

    /// Attach the remote id assigned on insert and mark the row synced
    pub fn set_remote_id(
        &self,
        kind: EntityKind,
        id: &LocalId,
        remote_id: &RemoteId,
    ) -> Result<()> {
        let table = kind.table();
        let rows = self.conn.execute(
            &format!("UPDATE {table} SET remote_id = ?1, synced = 1 WHERE local_id = ?2"),
            params![remote_id.as_str(), id.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(format!("{kind} {id}")));
        }
        Ok(())
    }

    /// Mark a row synced after a successful remote update.
    ///
    /// Only rows that already have a remote id qualify; a row can never be
    /// synced without one.
    pub fn mark_record_synced(&self, kind: EntityKind, id: &LocalId) -> Result<()> {
        let table = kind.table();
        self.conn.execute(
            &format!(
                "UPDATE {table} SET synced = 1
                 WHERE local_id = ?1 AND remote_id IS NOT NULL"
            ),
            params![id.as_str()],
        )?;
        Ok(())
    }

    /// Upsert a pulled remote row, remote state winning wholesale
    ///
    /// Matches an existing local row by remote id first, then by the
    /// echoed local id for rows that never round-tripped; rows never seen
    /// locally get a fresh local id. Returns the local id of the affected
    /// row.
    pub fn apply_remote(&self, record: &RemoteRecord) -> Result<LocalId> {
        let kind = record.payload.kind();
        let now = chrono::Utc::now().timestamp_millis();

        let local_id = match self.find_by_remote_id(kind, &record.remote_id)? {
            Some(existing) => existing.local_id,
            None => record.local_id.unwrap_or_else(LocalId::new),
        };

        self.put(&LocalRecord {
            local_id,
            remote_id: Some(record.remote_id.clone()),
            synced: true,
            payload: record.payload.clone(),
            updated_at: now,
        })?;

        Ok(local_id)
    }

    // ------------------------------------------------------------------
    // Sync queue
    // ------------------------------------------------------------------

    /// Append a queue entry for a locally-originated mutation
    pub fn enqueue(
        &self,
        entity: EntityKind,
        op: ChangeOp,
        local_id: &LocalId,
        payload: Option<&EntityPayload>,
    ) -> Result<ChangeEntry> {
        let payload_json = payload.map(EntityPayload::to_json).transpose()?;
        self.enqueue_raw(entity, op, local_id, payload_json.as_deref())
    }

    /// Append a queue entry with an already-serialized payload snapshot
    pub fn enqueue_raw(
        &self,
        entity: EntityKind,
        op: ChangeOp,
        local_id: &LocalId,
        payload_json: Option<&str>,
    ) -> Result<ChangeEntry> {
        let created_at = chrono::Utc::now().timestamp_millis();

        self.conn.execute(
            "INSERT INTO sync_queue (entity, op, local_id, payload, created_at, synced)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![
                entity.as_str(),
                op.as_str(),
                local_id.as_str(),
                payload_json,
                created_at,
            ],
        )?;

        Ok(ChangeEntry {
            id: self.conn.last_insert_rowid(),
            entity,
            op,
            local_id: *local_id,
            payload: payload_json.map(ToOwned::to_owned),
            created_at,
            synced: false,
            last_error: None,
        })
    }

    /// All unsynced queue entries, oldest first
    pub fn pending_queue_entries(&self) -> Result<Vec<ChangeEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, entity, op, local_id, payload, created_at, synced, last_error
             FROM sync_queue WHERE synced = 0
             ORDER BY created_at ASC, id ASC",
        )?;

        let raw_rows = stmt
            .query_map([], Self::raw_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw_rows.into_iter().map(Self::decode_entry).collect()
    }

    /// Number of unsynced queue entries
    pub fn pending_queue_count(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sync_queue WHERE synced = 0",
            [],
            |row| row.get(0),
        )?;
        #[allow(clippy::cast_sign_loss)]
        Ok(count as usize)
    }

    /// Unsynced entries whose last push attempt failed
    pub fn failed_queue_entries(&self) -> Result<Vec<ChangeEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, entity, op, local_id, payload, created_at, synced, last_error
             FROM sync_queue WHERE synced = 0 AND last_error IS NOT NULL
             ORDER BY created_at ASC, id ASC",
        )?;

        let raw_rows = stmt
            .query_map([], Self::raw_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw_rows.into_iter().map(Self::decode_entry).collect()
    }

    /// Whether a newer unsynced entry exists for the same record
    ///
    /// Used by the push phase to avoid marking a row synced while a later
    /// edit to it is still waiting in the queue.
    pub fn has_newer_pending_entry(&self, local_id: &LocalId, after_id: i64) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sync_queue
                WHERE synced = 0 AND local_id = ?1 AND id > ?2
            )",
            params![local_id.as_str(), after_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Mark a queue entry applied, clearing any recorded error
    pub fn mark_queue_entry_synced(&self, id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE sync_queue SET synced = 1, last_error = NULL WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    /// Record a push failure on a queue entry; it stays pending for retry
    pub fn mark_queue_entry_failed(&self, id: i64, error: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE sync_queue SET last_error = ?1 WHERE id = ?2",
            params![error, id],
        )?;
        Ok(())
    }

    /// Compaction: remove all synced queue entries. Idempotent.
    pub fn delete_synced_queue_entries(&self) -> Result<usize> {
        let rows = self
            .conn
            .execute("DELETE FROM sync_queue WHERE synced = 1", [])?;
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Row decoding
    // ------------------------------------------------------------------

    fn raw_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
        ))
    }

    fn decode_record(kind: EntityKind, raw: RawRecord) -> Result<LocalRecord> {
        let (local_id, remote_id, synced, data, updated_at) = raw;
        Ok(LocalRecord {
            local_id: local_id
                .parse()
                .map_err(|_| Error::InvalidInput(format!("invalid local id: {local_id}")))?,
            remote_id: remote_id.map(RemoteId::new),
            synced: synced != 0,
            payload: EntityPayload::from_json(kind, &data)?,
            updated_at,
        })
    }

    fn raw_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEntry> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
        ))
    }

    fn decode_entry(raw: RawEntry) -> Result<ChangeEntry> {
        let (id, entity, op, local_id, payload, created_at, synced, last_error) = raw;
        Ok(ChangeEntry {
            id,
            entity: entity.parse()?,
            op: op.parse()?,
            local_id: local_id
                .parse()
                .map_err(|_| Error::InvalidInput(format!("invalid local id: {local_id}")))?,
            payload,
            created_at,
            synced: synced != 0,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::Customer;
    use pretty_assertions::assert_eq;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn customer_record(name: &str) -> LocalRecord {
        LocalRecord::new(EntityPayload::Customer(Customer::new(name)))
    }

    #[test]
    fn put_then_get_roundtrip() {
        let db = setup();
        let store = LocalStore::new(db.connection());

        let record = customer_record("Ana");
        store.put(&record).unwrap();

        let fetched = store.get(EntityKind::Customer, &record.local_id).unwrap().unwrap();
        assert_eq!(fetched, record);
    }

    #[test]
    fn put_replaces_fields_wholesale() {
        let db = setup();
        let store = LocalStore::new(db.connection());

        let mut record = customer_record("Ana");
        record.payload = EntityPayload::Customer(Customer {
            name: "Ana".into(),
            phone: Some("11 1111".into()),
            email: Some("ana@example.com".into()),
            address: None,
        });
        store.put(&record).unwrap();

        record.payload = EntityPayload::Customer(Customer::new("Ana Paula"));
        store.put(&record).unwrap();

        let fetched = store.get(EntityKind::Customer, &record.local_id).unwrap().unwrap();
        let EntityPayload::Customer(customer) = fetched.payload else {
            panic!("wrong payload kind");
        };
        assert_eq!(customer.name, "Ana Paula");
        assert!(customer.phone.is_none(), "old fields must not survive");
    }

    #[test]
    fn get_missing_record_returns_none() {
        let db = setup();
        let store = LocalStore::new(db.connection());
        let found = store.get(EntityKind::Customer, &LocalId::new()).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn set_remote_id_marks_row_synced() {
        let db = setup();
        let store = LocalStore::new(db.connection());

        let record = customer_record("Ana");
        store.put(&record).unwrap();
        store
            .set_remote_id(EntityKind::Customer, &record.local_id, &RemoteId::new("R1"))
            .unwrap();

        let fetched = store.get(EntityKind::Customer, &record.local_id).unwrap().unwrap();
        assert!(fetched.synced);
        assert_eq!(fetched.remote_id, Some(RemoteId::new("R1")));
    }

    #[test]
    fn set_remote_id_on_missing_row_is_not_found() {
        let db = setup();
        let store = LocalStore::new(db.connection());
        let result = store.set_remote_id(EntityKind::Customer, &LocalId::new(), &RemoteId::new("R1"));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn mark_record_synced_requires_remote_id() {
        let db = setup();
        let store = LocalStore::new(db.connection());

        let record = customer_record("Ana");
        store.put(&record).unwrap();
        store.mark_record_synced(EntityKind::Customer, &record.local_id).unwrap();

        // No remote id yet, so the row must stay unsynced
        let fetched = store.get(EntityKind::Customer, &record.local_id).unwrap().unwrap();
        assert!(!fetched.synced);
    }

    #[test]
    fn apply_remote_upserts_by_remote_id_without_duplicating() {
        let db = setup();
        let store = LocalStore::new(db.connection());

        let first = RemoteRecord {
            remote_id: RemoteId::new("R1"),
            local_id: None,
            payload: EntityPayload::Customer(Customer::new("Ana")),
        };
        let local_id = store.apply_remote(&first).unwrap();

        let second = RemoteRecord {
            remote_id: RemoteId::new("R1"),
            local_id: None,
            payload: EntityPayload::Customer(Customer::new("Ana Paula")),
        };
        let same_id = store.apply_remote(&second).unwrap();

        assert_eq!(local_id, same_id);
        assert_eq!(store.list(EntityKind::Customer).unwrap().len(), 1);

        let fetched = store.get(EntityKind::Customer, &local_id).unwrap().unwrap();
        let EntityPayload::Customer(customer) = fetched.payload else {
            panic!("wrong payload kind");
        };
        assert_eq!(customer.name, "Ana Paula");
        assert!(fetched.synced);
    }

    #[test]
    fn apply_remote_reconciles_with_local_row_via_echoed_local_id() {
        let db = setup();
        let store = LocalStore::new(db.connection());

        // Local row that never round-tripped: no remote id yet
        let record = customer_record("Ana");
        store.put(&record).unwrap();

        let pulled = RemoteRecord {
            remote_id: RemoteId::new("R1"),
            local_id: Some(record.local_id),
            payload: EntityPayload::Customer(Customer::new("Ana")),
        };
        let applied_id = store.apply_remote(&pulled).unwrap();

        assert_eq!(applied_id, record.local_id);
        assert_eq!(
            store.list(EntityKind::Customer).unwrap().len(),
            1,
            "echoed local id must reconcile, not duplicate"
        );
        let fetched = store.get(EntityKind::Customer, &record.local_id).unwrap().unwrap();
        assert_eq!(fetched.remote_id, Some(RemoteId::new("R1")));
        assert!(fetched.synced);
    }

    #[test]
    fn pending_entries_come_back_in_creation_order() {
        let db = setup();
        let store = LocalStore::new(db.connection());

        let id = LocalId::new();
        let payload = EntityPayload::Customer(Customer::new("Ana"));
        store.enqueue(EntityKind::Customer, ChangeOp::Insert, &id, Some(&payload)).unwrap();
        store.enqueue(EntityKind::Customer, ChangeOp::Update, &id, Some(&payload)).unwrap();
        store.enqueue(EntityKind::Customer, ChangeOp::Delete, &id, None).unwrap();

        let pending = store.pending_queue_entries().unwrap();
        let ops: Vec<ChangeOp> = pending.iter().map(|entry| entry.op).collect();
        assert_eq!(ops, vec![ChangeOp::Insert, ChangeOp::Update, ChangeOp::Delete]);
    }

    #[test]
    fn newer_pending_entry_is_only_seen_for_the_same_record() {
        let db = setup();
        let store = LocalStore::new(db.connection());

        let id = LocalId::new();
        let other = LocalId::new();
        let payload = EntityPayload::Customer(Customer::new("Ana"));
        let first = store.enqueue(EntityKind::Customer, ChangeOp::Insert, &id, Some(&payload)).unwrap();
        let second = store.enqueue(EntityKind::Customer, ChangeOp::Update, &id, Some(&payload)).unwrap();

        assert!(store.has_newer_pending_entry(&id, first.id).unwrap());
        assert!(!store.has_newer_pending_entry(&id, second.id).unwrap());
        assert!(!store.has_newer_pending_entry(&other, first.id).unwrap());

        // Once the newer entry lands it no longer counts as pending
        store.mark_queue_entry_synced(second.id).unwrap();
        assert!(!store.has_newer_pending_entry(&id, first.id).unwrap());
    }

    #[test]
    fn marking_synced_clears_the_recorded_error() {
        let db = setup();
        let store = LocalStore::new(db.connection());

        let id = LocalId::new();
        let entry = store.enqueue(EntityKind::Customer, ChangeOp::Delete, &id, None).unwrap();
        store.mark_queue_entry_failed(entry.id, "remote exploded").unwrap();

        let failed = store.failed_queue_entries().unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].last_error.as_deref(), Some("remote exploded"));

        store.mark_queue_entry_synced(entry.id).unwrap();
        assert!(store.failed_queue_entries().unwrap().is_empty());
        assert_eq!(store.pending_queue_count().unwrap(), 0);
    }

    #[test]
    fn compaction_removes_only_synced_entries_and_is_idempotent() {
        let db = setup();
        let store = LocalStore::new(db.connection());

        let id = LocalId::new();
        let payload = EntityPayload::Customer(Customer::new("Ana"));
        let done = store.enqueue(EntityKind::Customer, ChangeOp::Insert, &id, Some(&payload)).unwrap();
        store.enqueue(EntityKind::Customer, ChangeOp::Update, &id, Some(&payload)).unwrap();
        store.mark_queue_entry_synced(done.id).unwrap();

        assert_eq!(store.delete_synced_queue_entries().unwrap(), 1);
        assert_eq!(store.pending_queue_count().unwrap(), 1);

        // Second pass with nothing new to remove leaves the queue unchanged
        assert_eq!(store.delete_synced_queue_entries().unwrap(), 0);
        assert_eq!(store.pending_queue_count().unwrap(), 1);
    }
}
