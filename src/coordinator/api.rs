//! Cart operations exposed to the UI layer.
//!
//! Mutations are synchronous and infallible from the caller's side: they
//! update the cart, write through the local tiers and hand the remote side
//! to the scheduler. Outcomes surface through [`SyncStatus`] and
//! [`CartEvent`]s.

use std::sync::atomic::Ordering;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, oneshot, watch};

use crate::cart::AddOutcome;
use crate::cart_item::{CartItem, ItemDescriptor, ItemId};

use super::scheduler::Command;
use super::{CartEvent, CartSession, SyncError, SyncState, SyncStatus};

impl CartSession {
    // ═══════════════════════════════════════════════════════════════════════
    // Mutations
    // ═══════════════════════════════════════════════════════════════════════

    /// Add one unit of a product.
    ///
    /// Increments an existing active line, reactivates a saved one at
    /// quantity 1, or appends a new line.
    pub fn add_item(&self, descriptor: ItemDescriptor) {
        let id = descriptor.id;
        let title = descriptor.title.clone();
        let outcome = self.mutate("add", |cart| Some(cart.add(descriptor, Utc::now())));

        let event = match outcome {
            Some(AddOutcome::Added) | None => CartEvent::ItemAdded { id, title },
            Some(AddOutcome::Incremented { quantity }) => CartEvent::QuantityIncreased { id, title, quantity },
            Some(AddOutcome::Reactivated) => CartEvent::SavedItemReactivated { id, title },
        };
        self.shared.emit(event);
    }

    /// Remove a line, active or saved. Emptying the cart clears the local
    /// tiers and the remote cart.
    pub fn remove_item(&self, id: ItemId) {
        if let Some(removed) = self.mutate("remove", |cart| cart.remove(id)) {
            self.shared.emit(CartEvent::ItemRemoved {
                id,
                title: removed.title,
                was_saved: removed.saved_for_later,
            });
        }
    }

    /// Set a line's quantity; 0 removes the line.
    pub fn update_quantity(&self, id: ItemId, quantity: u32) {
        if quantity < 1 {
            self.remove_item(id);
            return;
        }
        self.mutate("update_quantity", |cart| cart.set_quantity(id, quantity).then_some(()));
    }

    pub fn save_for_later(&self, id: ItemId) {
        if self.mutate("save_for_later", |cart| cart.save_for_later(id).then_some(())).is_some() {
            self.shared.emit(CartEvent::SavedForLater { id });
        }
    }

    /// Move a saved line back into the cart (counts as a fresh addition).
    pub fn move_to_cart(&self, id: ItemId) {
        if self
            .mutate("move_to_cart", |cart| cart.move_to_cart(id, Utc::now()).then_some(()))
            .is_some()
        {
            self.shared.emit(CartEvent::MovedToCart { id });
        }
    }

    /// Empty the cart, both local tiers and the remote cart.
    pub fn clear_cart(&self) {
        self.mutate("clear", |cart| {
            cart.clear();
            Some(())
        });
        self.shared.emit(CartEvent::CartCleared);
    }

    /// Sync now, bypassing the debounce.
    ///
    /// Offline, this does nothing but report [`SyncError::Offline`]; the
    /// reconnect will sync. A failed attempt returns the gateway error and
    /// starts the backoff ladder.
    pub async fn sync_cart(&self) -> Result<(), SyncError> {
        let (tx, rx) = oneshot::channel();
        if !self.send(Command::SyncNow(tx)) {
            return Err(SyncError::SessionClosed);
        }
        rx.await.map_err(|_| SyncError::SessionClosed)?
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Reads
    // ═══════════════════════════════════════════════════════════════════════

    /// All lines, active and saved, in cart order.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.shared.cart.lock().items().to_vec()
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.shared.cart.lock().item_count()
    }

    #[must_use]
    pub fn subtotal(&self) -> f64 {
        self.shared.cart.lock().subtotal()
    }

    #[must_use]
    pub fn saved_items(&self) -> Vec<CartItem> {
        self.shared.cart.lock().saved_items()
    }

    /// Active lines added within the configured recency window.
    #[must_use]
    pub fn recently_added_items(&self) -> Vec<CartItem> {
        let window = self.shared.config.recent_window();
        self.shared.cart.lock().recently_added(window, Utc::now())
    }

    #[must_use]
    pub fn sync_status(&self) -> SyncStatus {
        self.shared.status.borrow().clone()
    }

    /// Watch sync status changes.
    #[must_use]
    pub fn status_receiver(&self) -> watch::Receiver<SyncStatus> {
        self.shared.status.subscribe()
    }

    /// Subscribe to UI notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.shared.events.subscribe()
    }

    /// The remote holds exactly the local cart.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        let status = self.shared.status.borrow();
        status.state == SyncState::Success && !status.pending_changes
    }

    #[must_use]
    pub fn last_synced(&self) -> Option<DateTime<Utc>> {
        self.shared.status.borrow().last_synced
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.shared.connectivity.is_online()
    }

    /// Whether the session-start probe found remote cart storage.
    #[must_use]
    pub fn is_remote_available(&self) -> bool {
        self.shared.remote_available.load(Ordering::Acquire)
    }
}
