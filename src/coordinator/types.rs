//! Public types for the cart session coordinator.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::cart_item::ItemId;
use crate::storage::traits::GatewayError;

/// Where the sync cycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// Nothing attempted yet (or paused while offline)
    #[default]
    Idle,
    /// A remote call is in flight
    Syncing,
    /// The remote confirmed the last attempt
    Success,
    /// The last attempt failed
    Error,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Syncing => write!(f, "syncing"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Sync status exposed to the UI.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyncStatus {
    pub state: SyncState,
    pub last_synced: Option<DateTime<Utc>>,
    /// Human-readable message for the current state (errors, offline notice)
    pub error: Option<String>,
    pub retry_count: u32,
    /// Local state differs from the last confirmed remote state
    pub pending_changes: bool,
}

impl SyncStatus {
    pub(super) fn succeeded(now: DateTime<Utc>) -> Self {
        Self {
            state: SyncState::Success,
            last_synced: Some(now),
            error: None,
            retry_count: 0,
            pending_changes: false,
        }
    }
}

/// Notifications for an optional UI layer (toasts, badges).
#[derive(Debug, Clone, PartialEq)]
pub enum CartEvent {
    ItemAdded { id: ItemId, title: String },
    QuantityIncreased { id: ItemId, title: String, quantity: u32 },
    /// A saved item was put back in the cart by `add_item`
    SavedItemReactivated { id: ItemId, title: String },
    ItemRemoved { id: ItemId, title: String, was_saved: bool },
    SavedForLater { id: ItemId },
    MovedToCart { id: ItemId },
    CartCleared,
    WentOffline,
    BackOnline,
    SyncFailed { attempt: u32, max_attempts: u32, retry_in_secs: u64 },
    SyncGaveUp,
    /// A manual sync was requested while offline
    OfflineSyncRequested,
}

/// Why a manual sync or reconciliation did not reach the remote.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("offline: changes will be synced on reconnect")]
    Offline,
    #[error("remote cart storage is not available for this account")]
    RemoteUnavailable,
    #[error("no authenticated user; cart is local-only")]
    NotAuthenticated,
    #[error("remote call failed: {0}")]
    Gateway(#[from] GatewayError),
    #[error("cart session has shut down")]
    SessionClosed,
}

/// Summary of a completed reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub items: usize,
    pub remote_only: usize,
    pub local_only: usize,
    pub combined: usize,
    /// The merged cart still has to be pushed to the remote
    pub push_needed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_state_display() {
        assert_eq!(format!("{}", SyncState::Idle), "idle");
        assert_eq!(format!("{}", SyncState::Error), "error");
    }

    #[test]
    fn test_default_status_is_idle() {
        let status = SyncStatus::default();
        assert_eq!(status.state, SyncState::Idle);
        assert!(!status.pending_changes);
        assert_eq!(status.retry_count, 0);
        assert!(status.last_synced.is_none());
    }

    #[test]
    fn test_succeeded_clears_everything() {
        let now = Utc::now();
        let status = SyncStatus::succeeded(now);
        assert_eq!(status.state, SyncState::Success);
        assert_eq!(status.last_synced, Some(now));
        assert!(!status.pending_changes);
        assert!(status.error.is_none());
    }

    #[test]
    fn test_sync_error_from_gateway() {
        let err: SyncError = GatewayError::Transport("timeout".into()).into();
        assert_eq!(err.to_string(), "remote call failed: Transport error: timeout");
    }
}
