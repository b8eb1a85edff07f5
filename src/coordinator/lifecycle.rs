//! Session lifecycle: start, reconcile, shutdown.

use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{info, warn};

use crate::cart_item::UserId;
use crate::config::CartSyncConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::storage::local::DurableLocalStore;
use crate::storage::traits::CartGateway;

use super::scheduler::{Command, Scheduler};
use super::{CartSession, ReconcileSummary, Shared, SyncError, SyncStatus};

impl CartSession {
    /// Start a session.
    ///
    /// Startup flow:
    /// 1. Load the cart from the local tiers (first tier with a payload wins)
    /// 2. If a user is signed in, probe remote availability once
    /// 3. Spawn the sync scheduler
    /// 4. If signed in, provisioned and online, merge the remote cart in
    ///
    /// Never fails: a broken local store starts empty, an unreachable remote
    /// leaves the session local-only until reconnect.
    #[tracing::instrument(skip_all, fields(user = ?user))]
    pub async fn start(
        config: CartSyncConfig,
        user: Option<UserId>,
        local: DurableLocalStore,
        gateway: Arc<dyn CartGateway>,
        connectivity: ConnectivityMonitor,
    ) -> Self {
        let loaded = local.load();
        if loaded.recovered {
            warn!("Local cart was corrupt and has been reset");
        }

        let remote_available = match &user {
            Some(_) => match gateway.check_availability().await {
                Ok(true) => true,
                Ok(false) => {
                    warn!("Remote cart storage not provisioned, running local-only");
                    false
                }
                Err(e) => {
                    warn!(error = %e, "Remote availability probe failed, running local-only");
                    false
                }
            },
            None => false,
        };

        let (status, _) = watch::channel(SyncStatus::default());
        let (events, _) = broadcast::channel(config.event_buffer.max(1));

        let shared = Arc::new(Shared {
            config,
            user,
            cart: Mutex::new(loaded.cart),
            revision: AtomicU64::new(0),
            local,
            gateway,
            remote_available: AtomicBool::new(remote_available),
            connectivity,
            status,
            events,
        });

        let (commands, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(Scheduler::new(Arc::clone(&shared), rx).run());

        let session = Self {
            shared,
            commands,
            scheduler: Mutex::new(Some(handle)),
        };

        info!(
            items = session.shared.cart.lock().len(),
            remote_available,
            online = session.shared.connectivity.is_online(),
            "Cart session started"
        );

        if session.shared.sync_target().is_ok() {
            // Failure is already reflected in the sync status
            let _ = session.reconcile().await;
        }

        session
    }

    /// Fetch the remote cart and merge it into the local one.
    ///
    /// Runs automatically at start and on reconnect; call it again after a
    /// re-authentication. A merged cart that differs from the remote is pushed
    /// on the next scheduler cycle.
    pub async fn reconcile(&self) -> Result<ReconcileSummary, SyncError> {
        let (tx, rx) = oneshot::channel();
        if !self.send(Command::Reconcile(tx)) {
            return Err(SyncError::SessionClosed);
        }
        rx.await.map_err(|_| SyncError::SessionClosed)?
    }

    /// Stop the scheduler (logout). Pending timers are dropped; the local
    /// tiers already hold the latest cart.
    pub async fn shutdown(&self) {
        self.send(Command::Shutdown);
        let handle = self.scheduler.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Cart sync scheduler ended abnormally");
            }
        }
        info!("Cart session shut down");
    }
}
