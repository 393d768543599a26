//! Connectivity monitor fed by platform network-change signals

use tokio::sync::watch;

/// Tracks the current online/offline state
///
/// The platform shell forwards its network-change signals into
/// [`ConnectivityMonitor::set_online`]; consumers observe the state either
/// point-in-time via [`ConnectivityMonitor::is_online`] or as a stream via
/// [`ConnectivityMonitor::subscribe`]. The sync trigger loop reacts to the
/// offline-to-online transition; going offline only updates state and never
/// cancels an in-flight sync.
pub struct ConnectivityMonitor {
    state: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Create a monitor with the given initial state
    #[must_use]
    pub fn new(initially_online: bool) -> Self {
        let (state, _) = watch::channel(initially_online);
        Self { state }
    }

    /// Record a platform network-change signal
    ///
    /// Subscribers are only woken on actual transitions; repeated signals
    /// for the same state are ignored.
    pub fn set_online(&self, online: bool) {
        let changed = self.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            tracing::info!("Connectivity changed: {}", if online { "online" } else { "offline" });
        }
    }

    /// Current state, point-in-time
    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    /// Subscribe to state transitions
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        // Assume online until the platform says otherwise
        Self::new(true)
    }
}
