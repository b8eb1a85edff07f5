//! Sync scheduler: the single task that talks to the remote.
//!
//! Owns two cancellable timers:
//! - **debounce**: re-armed by every mutation, fires one save for a burst
//! - **retry**: the next rung of the backoff ladder after a failed attempt
//!
//! Attempts, merges and connectivity transitions all run on this task, so
//! remote calls never overlap and always carry the state current at call time.

use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep, Instant, Sleep};
use tracing::{debug, error, info, warn};

use crate::cart::Cart;
use crate::connectivity::NetworkState;
use crate::merge::MergeEngine;
use crate::resilience::retry::{retry, RetryConfig};
use crate::storage::traits::GatewayError;

use super::types::{CartEvent, ReconcileSummary, SyncError, SyncState, SyncStatus};
use super::Shared;

const OFFLINE_MESSAGE: &str = "You are currently offline. Changes will be synced when you reconnect.";
const GAVE_UP_MESSAGE: &str = "Failed to sync after multiple attempts. Please try again later.";
const FETCH_FAILED_MESSAGE: &str = "Failed to fetch your cart from the server.";

pub(crate) enum Command {
    /// The cart changed; (re)arm the debounce
    Mutated,
    /// The cart became empty; clear the remote now
    ClearRemote,
    /// Manual sync, bypassing the debounce
    SyncNow(oneshot::Sender<Result<(), SyncError>>),
    /// Fetch the remote cart and merge it in
    Reconcile(oneshot::Sender<Result<ReconcileSummary, SyncError>>),
    Shutdown,
}

pub(super) struct Scheduler {
    shared: Arc<Shared>,
    commands: mpsc::UnboundedReceiver<Command>,
    network: watch::Receiver<NetworkState>,
    watching_network: bool,
    last_network: NetworkState,
    backoff: RetryConfig,
    debounce: Option<Pin<Box<Sleep>>>,
    /// Pending retry timer and the retry number it will run as
    retry: Option<(Pin<Box<Sleep>>, u32)>,
}

impl Scheduler {
    pub(super) fn new(shared: Arc<Shared>, commands: mpsc::UnboundedReceiver<Command>) -> Self {
        let mut network = shared.connectivity.subscribe();
        let last_network = *network.borrow_and_update();
        let backoff = shared.config.retry_config();
        Self {
            shared,
            commands,
            network,
            watching_network: true,
            last_network,
            backoff,
            debounce: None,
            retry: None,
        }
    }

    pub(super) async fn run(mut self) {
        debug!("Cart sync scheduler started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command).await,
                },
                _ = wait(&mut self.debounce) => {
                    self.debounce = None;
                    debug!("Debounce elapsed, syncing");
                    let _ = self.attempt(0).await;
                }
                retry_count = wait_retry(&mut self.retry) => {
                    self.retry = None;
                    debug!(retry_count, "Backoff elapsed, retrying sync");
                    let _ = self.attempt(retry_count).await;
                }
                changed = self.network.changed(), if self.watching_network => match changed {
                    Ok(()) => {
                        let state = *self.network.borrow_and_update();
                        self.on_network(state).await;
                    }
                    Err(_) => self.watching_network = false,
                },
            }
        }
        debug!("Cart sync scheduler stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Mutated => {
                if self.retry.is_some() {
                    // The scheduled retry will send whatever is current when it fires
                    debug!("Mutation during backoff, riding the scheduled retry");
                } else {
                    self.arm_debounce();
                }
            }
            Command::ClearRemote => {
                self.cancel_timers();
                let _ = self.attempt(0).await;
            }
            Command::SyncNow(reply) => {
                let result = match self.shared.sync_target() {
                    Err(SyncError::Offline) => {
                        self.shared.emit(CartEvent::OfflineSyncRequested);
                        Err(SyncError::Offline)
                    }
                    Err(e) => Err(e),
                    Ok(_) => {
                        self.cancel_timers();
                        self.attempt(0).await
                    }
                };
                let _ = reply.send(result);
            }
            Command::Reconcile(reply) => {
                let result = self.reconcile().await;
                if let Ok(summary) = &result {
                    if summary.push_needed {
                        self.arm_debounce();
                    }
                }
                let _ = reply.send(result);
            }
            Command::Shutdown => {}
        }
    }

    fn arm_debounce(&mut self) {
        let deadline = Instant::now() + self.shared.config.debounce();
        match self.debounce.as_mut() {
            Some(timer) => timer.as_mut().reset(deadline),
            None => self.debounce = Some(Box::pin(tokio::time::sleep_until(deadline))),
        }
    }

    fn cancel_timers(&mut self) {
        self.debounce = None;
        self.retry = None;
    }

    /// One remote write of the current cart. `retry_count` is 0 for a fresh cycle.
    async fn attempt(&mut self, retry_count: u32) -> Result<(), SyncError> {
        let user = match self.shared.sync_target() {
            Ok(user) => user,
            Err(e) => {
                debug!(reason = %e, "Sync skipped");
                if matches!(e, SyncError::Offline) {
                    self.shared.update_status(|s| s.pending_changes = true);
                }
                return Err(e);
            }
        };

        let (items, revision) = {
            let cart = self.shared.cart.lock();
            (cart.items().to_vec(), self.shared.revision.load(Ordering::Acquire))
        };
        let operation = if items.is_empty() { "clear" } else { "save" };

        self.shared.update_status(|s| s.state = SyncState::Syncing);
        let started = std::time::Instant::now();
        let result = if items.is_empty() {
            self.shared.gateway.clear_cart(&user).await
        } else {
            self.shared.gateway.save_cart(&user, &items).await
        };
        crate::metrics::record_sync_latency(operation, started.elapsed());

        match result {
            Ok(()) => {
                // Mutations that landed during the call still need a push
                let stale = self.shared.revision.load(Ordering::Acquire) != revision;
                self.shared.update_status(|s| {
                    *s = SyncStatus::succeeded(Utc::now());
                    s.pending_changes = stale;
                });
                crate::metrics::record_sync_attempt(operation, "success");
                info!(user = %user, operation, items = items.len(), retry_count, "Cart synced");
                Ok(())
            }
            Err(e) => {
                crate::metrics::record_sync_attempt(operation, "error");
                self.schedule_retry(retry_count + 1, &e);
                Err(e.into())
            }
        }
    }

    fn schedule_retry(&mut self, retry_count: u32, cause: &GatewayError) {
        let max = self.shared.config.max_retries;
        match self.backoff.next_retry(retry_count) {
            Some(delay) => {
                warn!(
                    error = %cause,
                    attempt = retry_count,
                    max_attempts = max,
                    delay_secs = delay.as_secs(),
                    "Cart sync failed, backing off"
                );
                let secs = delay.as_secs_f64().round() as u64;
                self.shared.update_status(|s| {
                    s.state = SyncState::Error;
                    s.error = Some(format!(
                        "Sync failed. Retrying in {} seconds... (Attempt {}/{})",
                        secs, retry_count, max
                    ));
                    s.retry_count = retry_count;
                    s.pending_changes = true;
                });
                self.shared.emit(CartEvent::SyncFailed {
                    attempt: retry_count,
                    max_attempts: max,
                    retry_in_secs: secs,
                });
                crate::metrics::record_retry_scheduled(retry_count, delay);
                self.retry = Some((Box::pin(sleep(delay)), retry_count));
            }
            None => {
                error!(error = %cause, retries = max, "Cart sync gave up after exhausting retries");
                self.shared.update_status(|s| {
                    s.state = SyncState::Error;
                    s.error = Some(GAVE_UP_MESSAGE.to_string());
                    s.retry_count = max;
                    s.pending_changes = true;
                });
                self.shared.emit(CartEvent::SyncGaveUp);
                crate::metrics::record_retries_exhausted();
            }
        }
    }

    async fn on_network(&mut self, state: NetworkState) {
        if state == self.last_network {
            return;
        }
        self.last_network = state;

        match state {
            NetworkState::Offline => {
                warn!("Went offline, pausing cart sync");
                self.cancel_timers();
                self.shared.update_status(|s| {
                    s.state = SyncState::Idle;
                    s.error = Some(OFFLINE_MESSAGE.to_string());
                    s.pending_changes = true;
                });
                self.shared.emit(CartEvent::WentOffline);
            }
            NetworkState::Online => {
                info!("Back online");
                self.shared.emit(CartEvent::BackOnline);
                let pending = self.shared.status.borrow().pending_changes;
                self.shared.update_status(|s| {
                    if s.error.as_deref() == Some(OFFLINE_MESSAGE) {
                        s.error = None;
                    }
                });
                if !self.shared.remote_enabled() {
                    return;
                }

                let push_needed = match self.reconcile().await {
                    Ok(summary) => summary.push_needed,
                    Err(e) => {
                        warn!(error = %e, "Reconnect merge failed, pushing local state");
                        true
                    }
                };
                if pending || push_needed {
                    self.cancel_timers();
                    let _ = self.attempt(0).await;
                }
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn reconcile(&mut self) -> Result<ReconcileSummary, SyncError> {
        let user = self.shared.sync_target()?;
        self.shared.update_status(|s| s.state = SyncState::Syncing);

        let gateway = Arc::clone(&self.shared.gateway);
        let fetch_retry = self.shared.config.fetch_retry_config();
        let fetched = retry("fetch_cart", &fetch_retry, || {
            let gateway = Arc::clone(&gateway);
            let user = user.clone();
            async move { gateway.fetch_cart(&user).await }
        })
        .await;
        crate::metrics::record_sync_attempt("fetch", if fetched.is_ok() { "success" } else { "error" });

        let remote = match fetched {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Failed to fetch remote cart, keeping local cart");
                self.shared.update_status(|s| {
                    s.state = SyncState::Error;
                    s.error = Some(FETCH_FAILED_MESSAGE.to_string());
                });
                return Err(e.into());
            }
        };

        // Merge against the cart as it is now, not as it was before the fetch
        let report = {
            let mut cart = self.shared.cart.lock();
            let report = MergeEngine::merge(cart.items(), &remote);
            *cart = Cart::from_items(report.items.clone());
            self.shared.persist_locally(&cart);
            report
        };
        self.shared.revision.fetch_add(1, Ordering::AcqRel);
        crate::metrics::record_merge(report.remote_only, report.local_only, report.combined);

        self.shared.update_status(|s| {
            *s = SyncStatus::succeeded(Utc::now());
            s.pending_changes = report.differs_from_remote;
        });
        info!(
            user = %user,
            items = report.items.len(),
            remote_only = report.remote_only,
            local_only = report.local_only,
            combined = report.combined,
            "Merged remote cart"
        );

        Ok(ReconcileSummary {
            items: report.items.len(),
            remote_only: report.remote_only,
            local_only: report.local_only,
            combined: report.combined,
            push_needed: report.differs_from_remote,
        })
    }
}

async fn wait(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(timer) => timer.as_mut().await,
        None => std::future::pending().await,
    }
}

async fn wait_retry(timer: &mut Option<(Pin<Box<Sleep>>, u32)>) -> u32 {
    match timer {
        Some((timer, retry_count)) => {
            timer.as_mut().await;
            *retry_count
        }
        None => std::future::pending().await,
    }
}
