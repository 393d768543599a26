//! Database migrations

use rusqlite::Connection;

use crate::error::Result;
use crate::models::EntityKind;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// Migration to version 1: entity tables plus the sync queue
fn migrate_v1(conn: &Connection) -> Result<()> {
    let mut sql = String::from(
        "BEGIN;
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );
        CREATE TABLE IF NOT EXISTS sync_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entity TEXT NOT NULL,
            op TEXT NOT NULL,
            local_id TEXT NOT NULL,
            payload TEXT,
            created_at INTEGER NOT NULL,
            synced INTEGER NOT NULL DEFAULT 0,
            last_error TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_sync_queue_pending
            ON sync_queue(synced, created_at, id);
        ",
    );

    // One identically-shaped table per tracked entity kind
    for kind in EntityKind::ALL {
        let table = kind.table();
        sql.push_str(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                local_id TEXT PRIMARY KEY,
                remote_id TEXT,
                synced INTEGER NOT NULL DEFAULT 0,
                data TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_remote
                ON {table}(remote_id) WHERE remote_id IS NOT NULL;
            CREATE INDEX IF NOT EXISTS idx_{table}_updated
                ON {table}(updated_at DESC);
            "
        ));
    }

    sql.push_str("INSERT INTO schema_version (version) VALUES (1);\nCOMMIT;");

    if let Err(error) = conn.execute_batch(&sql) {
        conn.execute_batch("ROLLBACK").ok();
        return Err(error.into());
    }

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
