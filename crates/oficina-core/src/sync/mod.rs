//! Offline-first synchronization: change recording, connectivity,
//! the sync engine, and the background trigger loop

mod connectivity;
mod engine;
mod recorder;
mod remote;
mod scheduler;

pub use connectivity::ConnectivityMonitor;
pub use engine::{SyncEngine, SyncNotice, SyncOutcome, SyncReport, SyncStatus};
pub use recorder::ChangeRecorder;
pub use remote::{RemoteKey, RemoteStore};
pub use scheduler::{spawn_sync_loop, SyncHandle};
