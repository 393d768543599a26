//! Sync orchestrator: push phase, pull phase, and queue compaction

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, watch, Mutex};

use crate::config::SyncConfig;
use crate::db::{Database, LocalStore};
use crate::error::{Error, Result};
use crate::models::{ChangeEntry, ChangeOp, EntityKind, EntityPayload};
use crate::sync::connectivity::ConnectivityMonitor;
use crate::sync::recorder::DeleteKey;
use crate::sync::remote::{RemoteKey, RemoteStore};

const NOTICE_CHANNEL_CAPACITY: usize = 32;

/// User-visible notice emitted by the sync engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncNotice {
    /// A full sync cycle finished
    Completed { pushed: usize, pulled: usize },
    /// A sync cycle failed as a whole (row-level failures retry silently)
    Failed { message: String },
    /// Connectivity was lost; the app keeps working offline
    WentOffline,
    /// Connectivity came back; a sync was triggered
    BackOnline,
}

/// Counters from one completed sync cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Queue entries applied remotely
    pub pushed: usize,
    /// Queue entries whose push failed and will be retried next cycle
    pub push_failures: usize,
    /// Rows refreshed from the remote store
    pub pulled: usize,
    /// Synced queue entries removed by compaction
    pub compacted: usize,
}

/// Result of a [`SyncEngine::sync`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Another sync was already running; this call was a no-op
    AlreadyInFlight,
    /// This call ran a full cycle
    Completed(SyncReport),
}

/// Point-in-time snapshot for status screens
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub online: bool,
    pub in_flight: bool,
    pub pending_entries: usize,
    /// Unix ms of the last successful cycle
    pub last_synced_at: Option<i64>,
    /// Message from the last failed cycle, cleared on success
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct EngineState {
    last_synced_at: Option<i64>,
    last_error: Option<String>,
}

/// Clears the in-flight flag on every exit path, including early returns
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// The single entry point for "synchronize now"
///
/// Serializes concurrent attempts through an atomic in-flight guard and
/// runs, strictly in order: push phase over all tables, pull phase over
/// all tables, queue compaction. Row- and table-level failures are
/// isolated; only a failure of the cycle itself surfaces to the caller.
pub struct SyncEngine {
    db: Arc<Mutex<Database>>,
    remote: Arc<dyn RemoteStore>,
    config: SyncConfig,
    online: watch::Receiver<bool>,
    in_flight: AtomicBool,
    notices: broadcast::Sender<SyncNotice>,
    state: Mutex<EngineState>,
}

impl SyncEngine {
    /// Create an engine over the shared database and remote collaborator
    pub fn new(
        db: Arc<Mutex<Database>>,
        remote: Arc<dyn RemoteStore>,
        connectivity: &ConnectivityMonitor,
        config: SyncConfig,
    ) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        Self {
            db,
            remote,
            config,
            online: connectivity.subscribe(),
            in_flight: AtomicBool::new(false),
            notices,
            state: Mutex::new(EngineState::default()),
        }
    }

    /// The engine's configuration
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Subscribe to user-visible sync notices
    pub fn subscribe_notices(&self) -> broadcast::Receiver<SyncNotice> {
        self.notices.subscribe()
    }

    pub(crate) fn notify(&self, notice: SyncNotice) {
        // Nobody listening is fine
        let _ = self.notices.send(notice);
    }

    /// Snapshot of the engine's state for status screens
    pub async fn status(&self) -> Result<SyncStatus> {
        let pending_entries = self
            .with_store(|store| store.pending_queue_count())
            .await?;
        let state = self.state.lock().await;
        Ok(SyncStatus {
            online: *self.online.borrow(),
            in_flight: self.in_flight.load(Ordering::SeqCst),
            pending_entries,
            last_synced_at: state.last_synced_at,
            last_error: state.last_error.clone(),
        })
    }

    /// Run one sync cycle, unless one is already in flight
    ///
    /// Overlapping calls collapse into a single effective run; the losing
    /// caller gets [`SyncOutcome::AlreadyInFlight`] without touching the
    /// queue.
    pub async fn sync(&self) -> Result<SyncOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Sync already in flight, skipping");
            return Ok(SyncOutcome::AlreadyInFlight);
        }
        let _guard = InFlightGuard {
            flag: &self.in_flight,
        };

        tracing::debug!("Sync cycle started");
        match self.run_cycle().await {
            Ok(report) => {
                {
                    let mut state = self.state.lock().await;
                    state.last_synced_at = Some(chrono::Utc::now().timestamp_millis());
                    state.last_error = None;
                }
                tracing::info!(
                    pushed = report.pushed,
                    push_failures = report.push_failures,
                    pulled = report.pulled,
                    compacted = report.compacted,
                    "Sync cycle completed"
                );
                self.notify(SyncNotice::Completed {
                    pushed: report.pushed,
                    pulled: report.pulled,
                });
                Ok(SyncOutcome::Completed(report))
            }
            Err(error) => {
                {
                    let mut state = self.state.lock().await;
                    state.last_error = Some(error.to_string());
                }
                tracing::warn!("Sync cycle failed: {error}");
                self.notify(SyncNotice::Failed {
                    message: error.to_string(),
                });
                Err(error)
            }
        }
    }

    async fn run_cycle(&self) -> Result<SyncReport> {
        let (pushed, push_failures) = self.push_phase().await?;
        let pulled = self.pull_phase().await?;
        let compacted = self
            .with_store(|store| store.delete_synced_queue_entries())
            .await?;
        Ok(SyncReport {
            pushed,
            push_failures,
            pulled,
            compacted,
        })
    }

    // ------------------------------------------------------------------
    // Push phase (local -> remote)
    // ------------------------------------------------------------------

    async fn push_phase(&self) -> Result<(usize, usize)> {
        let pending = self
            .with_store(|store| store.pending_queue_entries())
            .await?;
        if pending.is_empty() {
            return Ok((0, 0));
        }
        tracing::debug!("Pushing {} pending queue entries", pending.len());

        let mut pushed = 0;
        let mut failures = 0;
        for entry in pending {
            match self.push_entry(&entry).await {
                Ok(()) => {
                    self.with_store(|store| store.mark_queue_entry_synced(entry.id))
                        .await?;
                    pushed += 1;
                }
                Err(error) if Self::is_entry_scoped(&error) => {
                    tracing::warn!(
                        entry = entry.id,
                        entity = %entry.entity,
                        op = %entry.op,
                        "Push failed for queue entry: {error}"
                    );
                    self.with_store(|store| {
                        store.mark_queue_entry_failed(entry.id, &error.to_string())
                    })
                    .await?;
                    failures += 1;
                }
                Err(error) => return Err(error),
            }
        }
        Ok((pushed, failures))
    }

    async fn push_entry(&self, entry: &ChangeEntry) -> Result<()> {
        match entry.op {
            ChangeOp::Insert => {
                let payload = Self::entry_payload(entry)?;
                let remote_id = self
                    .bounded(self.remote.insert(&entry.local_id, &payload))
                    .await?;
                let attach = self
                    .with_store(|store| {
                        store.set_remote_id(entry.entity, &entry.local_id, &remote_id)
                    })
                    .await;
                match attach {
                    // Row deleted locally after enqueue; its delete entry follows
                    Err(Error::NotFound(_)) => {
                        tracing::debug!(
                            entry = entry.id,
                            "Inserted row no longer exists locally"
                        );
                        Ok(())
                    }
                    other => other,
                }
            }
            ChangeOp::Update => {
                let payload = Self::entry_payload(entry)?;
                let row = self
                    .with_store(|store| store.get(entry.entity, &entry.local_id))
                    .await?;
                let key = row
                    .and_then(|row| row.remote_id)
                    .map_or(RemoteKey::Local(entry.local_id), RemoteKey::Remote);

                self.bounded(self.remote.update(entry.entity, &key, &payload))
                    .await?;
                if matches!(key, RemoteKey::Remote(_)) {
                    self.with_store(|store| {
                        // A later edit to this row may still be pending (or
                        // just failed); the row is only current remotely
                        // once its newest entry lands.
                        if store.has_newer_pending_entry(&entry.local_id, entry.id)? {
                            return Ok(());
                        }
                        store.mark_record_synced(entry.entity, &entry.local_id)
                    })
                    .await?;
                }
                Ok(())
            }
            ChangeOp::Delete => {
                let key = entry
                    .payload
                    .as_deref()
                    .map(serde_json::from_str::<DeleteKey>)
                    .transpose()?
                    .and_then(|key| key.remote_id)
                    .map_or(RemoteKey::Local(entry.local_id), RemoteKey::Remote);

                self.bounded(self.remote.delete(entry.entity, &key)).await
            }
        }
    }

    // ------------------------------------------------------------------
    // Pull phase (remote -> local)
    // ------------------------------------------------------------------

    async fn pull_phase(&self) -> Result<usize> {
        let limit = self.config.pull_limit;
        let mut pulled = 0;

        for kind in EntityKind::ALL {
            let rows = match self.bounded(self.remote.list_recent(kind, limit)).await {
                Ok(rows) => rows,
                Err(error) if error.is_remote() => {
                    tracing::warn!("Pull skipped for {kind} this cycle: {error}");
                    continue;
                }
                Err(error) => return Err(error),
            };

            if limit > 0 && rows.len() as u64 >= u64::from(limit) {
                tracing::warn!(
                    "Pull for {kind} returned the full {limit}-row cap; older remote rows are not refreshed"
                );
            }
            if rows.is_empty() {
                continue;
            }

            self.with_store(|store| {
                for row in &rows {
                    store.apply_remote(row)?;
                }
                Ok(())
            })
            .await?;
            pulled += rows.len();
        }

        Ok(pulled)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Run a closure against the local store under a short-lived lock
    async fn with_store<T>(&self, f: impl FnOnce(&LocalStore<'_>) -> Result<T>) -> Result<T> {
        let db = self.db.lock().await;
        f(&LocalStore::new(db.connection()))
    }

    /// Bound a remote call with the configured timeout
    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>> + Send) -> Result<T> {
        tokio::time::timeout(self.config.remote_timeout, fut)
            .await
            .map_err(|_| Error::RemoteTimeout)?
    }

    /// Failures isolated to a single queue entry: remote errors and
    /// unreadable payload snapshots. Local storage errors stay fatal.
    fn is_entry_scoped(error: &Error) -> bool {
        matches!(
            error,
            Error::Remote(_)
                | Error::RemoteTimeout
                | Error::Serialization(_)
                | Error::InvalidInput(_)
        )
    }

    fn entry_payload(entry: &ChangeEntry) -> Result<EntityPayload> {
        let json = entry.payload.as_deref().ok_or_else(|| {
            Error::InvalidInput(format!("queue entry {} has no payload snapshot", entry.id))
        })?;
        EntityPayload::from_json(entry.entity, json)
    }
}
