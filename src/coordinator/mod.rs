// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cart session coordinator.
//!
//! The [`CartSession`] is the explicit context object that ties together:
//! - the in-memory [`Cart`] and its mutation API
//! - the [`DurableLocalStore`] written through on every change
//! - the sync scheduler task (debounce, backoff, reconnect, merge)
//! - the [`CartGateway`] to the remote cart
//!
//! # Lifecycle
//!
//! ```text
//! start (load local → probe remote → spawn scheduler → merge once) → mutations ... → shutdown
//! ```
//!
//! Mutations return immediately after the in-memory and local writes; remote
//! work happens on the scheduler task, one step at a time.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cart_sync::{CartSession, CartSyncConfig, ConnectivityMonitor, DurableLocalStore, InMemoryGateway, UserId};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = CartSyncConfig::default();
//! let local = DurableLocalStore::from_config(&config).expect("local store");
//! let session = CartSession::start(
//!     config,
//!     Some(UserId::new("user-42")),
//!     local,
//!     Arc::new(InMemoryGateway::new()),
//!     ConnectivityMonitor::online(),
//! )
//! .await;
//!
//! assert_eq!(session.item_count(), 0);
//! session.shutdown().await;
//! # }
//! ```

mod api;
mod lifecycle;
mod scheduler;
mod types;

pub use types::{CartEvent, ReconcileSummary, SyncError, SyncState, SyncStatus};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::cart::Cart;
use crate::cart_item::UserId;
use crate::config::CartSyncConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::storage::local::DurableLocalStore;
use crate::storage::traits::CartGateway;

use scheduler::Command;

/// State shared between the session handle and its scheduler task.
pub(crate) struct Shared {
    pub(super) config: CartSyncConfig,

    /// Authenticated user; `None` means a guest (local-only) session
    pub(super) user: Option<UserId>,

    /// The cart. Locks are never held across an await.
    pub(super) cart: Mutex<Cart>,

    /// Bumped on every mutation so a finished sync can tell whether it is stale
    pub(super) revision: AtomicU64,

    pub(super) local: DurableLocalStore,

    pub(super) gateway: Arc<dyn CartGateway>,

    /// Result of the session-start availability probe
    pub(super) remote_available: AtomicBool,

    pub(super) connectivity: ConnectivityMonitor,

    /// Sync status (broadcast to watchers)
    pub(super) status: watch::Sender<SyncStatus>,

    /// UI notifications; sending with no subscribers is fine
    pub(super) events: broadcast::Sender<CartEvent>,
}

impl Shared {
    /// The user to sync for, if remote sync is possible right now.
    pub(super) fn sync_target(&self) -> Result<UserId, SyncError> {
        let user = self.user.clone().ok_or(SyncError::NotAuthenticated)?;
        if !self.remote_available.load(Ordering::Acquire) {
            return Err(SyncError::RemoteUnavailable);
        }
        if !self.connectivity.is_online() {
            return Err(SyncError::Offline);
        }
        Ok(user)
    }

    /// Remote sync is configured for this session (regardless of connectivity).
    pub(super) fn remote_enabled(&self) -> bool {
        self.user.is_some() && self.remote_available.load(Ordering::Acquire)
    }

    pub(super) fn update_status(&self, f: impl FnOnce(&mut SyncStatus)) {
        self.status.send_modify(f);
        crate::metrics::set_pending_changes(self.status.borrow().pending_changes);
    }

    pub(super) fn emit(&self, event: CartEvent) {
        let _ = self.events.send(event);
    }

    /// Write the cart through every local tier, logging (not raising) failures.
    pub(super) fn persist_locally(&self, cart: &Cart) {
        if let Err(e) = self.local.persist(cart) {
            warn!(error = %e, "Local cart write incomplete");
        }
    }
}

/// A user's cart for the lifetime of one client session.
///
/// Constructed with [`CartSession::start`], torn down with
/// [`CartSession::shutdown`] (logout). Dropping the session also stops the
/// scheduler once its command channel closes.
pub struct CartSession {
    pub(super) shared: Arc<Shared>,

    /// Commands to the scheduler task
    pub(super) commands: mpsc::UnboundedSender<Command>,

    pub(super) scheduler: Mutex<Option<JoinHandle<()>>>,
}

impl CartSession {
    /// Send a command, tolerating a stopped scheduler.
    pub(super) fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Apply a mutation, then write through locally and schedule the remote side.
    ///
    /// `f` returns `None` when nothing changed; no write or sync happens then.
    pub(super) fn mutate<R>(&self, kind: &'static str, f: impl FnOnce(&mut Cart) -> Option<R>) -> Option<R> {
        let (result, now_empty) = {
            let mut cart = self.shared.cart.lock();
            let result = f(&mut cart)?;
            // Under the lock so local writes land in mutation order
            self.shared.persist_locally(&cart);
            (result, cart.is_empty())
        };

        self.shared.revision.fetch_add(1, Ordering::AcqRel);
        crate::metrics::record_mutation(kind);

        // Pending until a sync confirms it, even when no sync is possible.
        // An empty cart only owes a remote clear.
        if !now_empty || self.shared.remote_enabled() {
            self.shared.update_status(|s| s.pending_changes = true);
        }
        let command = if now_empty { Command::ClearRemote } else { Command::Mutated };
        self.send(command);

        Some(result)
    }
}
