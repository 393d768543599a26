//! Background trigger loop: periodic syncs plus reconnection syncs

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::sync::connectivity::ConnectivityMonitor;
use crate::sync::engine::{SyncEngine, SyncNotice};

/// Handle to the background trigger loop
///
/// Dropping the handle without calling [`SyncHandle::shutdown`] detaches
/// the loop; it keeps running until the runtime shuts down.
pub struct SyncHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Stop the trigger loop and wait for it to finish
    ///
    /// An in-flight sync cycle runs to completion first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// Spawn the background trigger loop for an engine
///
/// Triggers a sync on a fixed interval while online and immediately on
/// every offline-to-online transition. Triggers that land while a cycle is
/// already in flight collapse into that cycle. Going offline never cancels
/// a running cycle.
pub fn spawn_sync_loop(engine: Arc<SyncEngine>, connectivity: &ConnectivityMonitor) -> SyncHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let mut online_rx = connectivity.subscribe();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(engine.config().sync_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if *online_rx.borrow_and_update() {
                        trigger(&engine).await;
                    } else {
                        tracing::debug!("Skipping periodic sync while offline");
                    }
                }
                changed = online_rx.changed() => {
                    if changed.is_err() {
                        tracing::debug!("Connectivity monitor dropped, stopping trigger loop");
                        break;
                    }
                    if *online_rx.borrow_and_update() {
                        tracing::info!("Back online, triggering sync");
                        engine.notify(SyncNotice::BackOnline);
                        trigger(&engine).await;
                    } else {
                        engine.notify(SyncNotice::WentOffline);
                    }
                }
                _ = shutdown_rx.changed() => {
                    tracing::debug!("Trigger loop shutting down");
                    break;
                }
            }
        }
    });

    SyncHandle { shutdown, task }
}

async fn trigger(engine: &SyncEngine) {
    // Cycle failures are already logged and broadcast by the engine
    let _ = engine.sync().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::db::Database;
    use crate::error::Result;
    use crate::models::{Customer, EntityKind, EntityPayload, LocalId, RemoteId, RemoteRecord};
    use crate::sync::recorder::ChangeRecorder;
    use crate::sync::remote::{RemoteKey, RemoteStore};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// Counts inserts pushed to it; everything else succeeds silently
    #[derive(Default)]
    struct CountingRemote {
        inserts: AtomicUsize,
    }

    #[async_trait]
    impl RemoteStore for CountingRemote {
        async fn insert(&self, _local_id: &LocalId, _payload: &EntityPayload) -> Result<RemoteId> {
            let n = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(RemoteId::new(format!("R{n}")))
        }

        async fn update(
            &self,
            _kind: EntityKind,
            _key: &RemoteKey,
            _payload: &EntityPayload,
        ) -> Result<()> {
            Ok(())
        }

        async fn delete(&self, _kind: EntityKind, _key: &RemoteKey) -> Result<()> {
            Ok(())
        }

        async fn list_recent(&self, _kind: EntityKind, _limit: u32) -> Result<Vec<RemoteRecord>> {
            Ok(Vec::new())
        }
    }

    fn setup(
        online: bool,
        interval: Duration,
    ) -> (
        Arc<SyncEngine>,
        ChangeRecorder,
        Arc<CountingRemote>,
        ConnectivityMonitor,
    ) {
        let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
        let remote = Arc::new(CountingRemote::default());
        let monitor = ConnectivityMonitor::new(online);
        let engine = Arc::new(SyncEngine::new(
            Arc::clone(&db),
            Arc::clone(&remote) as Arc<dyn RemoteStore>,
            &monitor,
            SyncConfig::default().with_sync_interval(interval),
        ));
        (engine, ChangeRecorder::new(db), remote, monitor)
    }

    /// Interval long enough that only explicit triggers fire mid-test
    const QUIET_INTERVAL: Duration = Duration::from_secs(300);

    #[tokio::test(flavor = "multi_thread")]
    async fn reconnection_triggers_a_sync() {
        let (engine, recorder, remote, monitor) = setup(false, QUIET_INTERVAL);
        let mut notices = engine.subscribe_notices();
        let handle = spawn_sync_loop(Arc::clone(&engine), &monitor);

        recorder
            .record_insert(EntityPayload::Customer(Customer::new("Ana")))
            .await
            .unwrap();

        // Offline: nothing pushed yet
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(remote.inserts.load(Ordering::SeqCst), 0);

        monitor.set_online(true);
        assert_eq!(notices.recv().await.unwrap(), SyncNotice::BackOnline);
        assert!(matches!(
            notices.recv().await.unwrap(),
            SyncNotice::Completed { pushed: 1, .. }
        ));
        assert_eq!(remote.inserts.load(Ordering::SeqCst), 1);

        handle.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ticks_skipped_offline_and_a_reconnect_push_the_entry_once() {
        // Interval short enough that several ticks elapse during the test
        let (engine, recorder, remote, monitor) = setup(false, Duration::from_millis(20));
        let handle = spawn_sync_loop(Arc::clone(&engine), &monitor);

        recorder
            .record_insert(EntityPayload::Customer(Customer::new("Ana")))
            .await
            .unwrap();

        // Several ticks fire while offline; none of them may push
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(remote.inserts.load(Ordering::SeqCst), 0);

        monitor.set_online(true);
        // Reconnect trigger plus further periodic ticks settle
        tokio::time::sleep(Duration::from_millis(100)).await;

        // The entry was pushed exactly once across all triggers
        assert_eq!(remote.inserts.load(Ordering::SeqCst), 1);
        assert_eq!(engine.status().await.unwrap().pending_entries, 0);

        handle.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn going_offline_emits_a_notice_without_syncing() {
        let (engine, _recorder, remote, monitor) = setup(true, QUIET_INTERVAL);
        let handle = spawn_sync_loop(Arc::clone(&engine), &monitor);

        // Let the initial periodic tick drain
        tokio::time::sleep(Duration::from_millis(50)).await;
        let baseline = remote.inserts.load(Ordering::SeqCst);

        let mut notices = engine.subscribe_notices();
        monitor.set_online(false);
        assert_eq!(notices.recv().await.unwrap(), SyncNotice::WentOffline);
        assert_eq!(remote.inserts.load(Ordering::SeqCst), baseline);

        handle.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shutdown_stops_the_loop() {
        let (engine, _recorder, _remote, monitor) = setup(true, QUIET_INTERVAL);
        let handle = spawn_sync_loop(engine, &monitor);
        handle.shutdown().await;
        // set_online after shutdown must not panic or trigger anything
        monitor.set_online(false);
        monitor.set_online(true);
    }
}
