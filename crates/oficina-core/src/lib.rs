//! oficina-core - Core library for Oficina
//!
//! Offline-first local cache and sync engine for the workshop app: all
//! reads and writes hit the local `SQLite` store, every local mutation is
//! recorded in a durable sync queue, and a background engine pushes the
//! queue to the remote store and pulls recent remote rows back whenever
//! connectivity allows.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod sync;

pub use config::SyncConfig;
pub use error::{Error, Result};
pub use models::{EntityKind, EntityPayload, LocalId, LocalRecord, RemoteId};
pub use sync::{ChangeRecorder, ConnectivityMonitor, SyncEngine};
