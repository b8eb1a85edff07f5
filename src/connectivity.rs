// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Connectivity monitor.
//!
//! Tracks the online/offline signal of the host environment. The platform
//! glue (browser bridge, OS network watcher, test harness) feeds raw state
//! in; subscribers only ever see edges, never repeated identical states.
//!
//! # Example
//!
//! ```
//! use cart_sync::{ConnectivityMonitor, ConnectivityEvent, NetworkState};
//!
//! let monitor = ConnectivityMonitor::new(NetworkState::Online);
//! assert_eq!(monitor.set_online(true), None); // no edge
//! assert_eq!(monitor.set_online(false), Some(ConnectivityEvent::WentOffline));
//! assert!(!monitor.is_online());
//! ```

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Network connectivity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkState {
    Online,
    Offline,
}

impl std::fmt::Display for NetworkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// An online/offline transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    WentOffline,
    CameOnline,
}

/// Shared handle on the environment's connectivity.
///
/// Cloning is cheap; every clone drives the same signal.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    tx: Arc<watch::Sender<NetworkState>>,
}

impl ConnectivityMonitor {
    #[must_use]
    pub fn new(initial: NetworkState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Monitor that starts online.
    #[must_use]
    pub fn online() -> Self {
        Self::new(NetworkState::Online)
    }

    #[must_use]
    pub fn state(&self) -> NetworkState {
        *self.tx.borrow()
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.state() == NetworkState::Online
    }

    /// Feed a raw state reading. Returns the edge, if this reading is one.
    pub fn set_state(&self, state: NetworkState) -> Option<ConnectivityEvent> {
        let changed = self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        if !changed {
            return None;
        }

        info!(state = %state, "Connectivity changed");
        Some(match state {
            NetworkState::Online => ConnectivityEvent::CameOnline,
            NetworkState::Offline => ConnectivityEvent::WentOffline,
        })
    }

    pub fn set_online(&self, online: bool) -> Option<ConnectivityEvent> {
        self.set_state(if online { NetworkState::Online } else { NetworkState::Offline })
    }

    /// Receiver notified on every edge.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<NetworkState> {
        self.tx.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::online()
    }
}
