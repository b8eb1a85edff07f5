//! # Cart Sync
//!
//! Client-side shopping cart state with durable local persistence and
//! debounced, retrying synchronization to a per-user remote cart.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CartSession (API)                       │
//! │  • add / remove / quantity / save-for-later / clear        │
//! │  • derived views: count, subtotal, saved, recently added   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                  (write-through on every mutation)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Durable Local Store                        │
//! │  • Session tier (memory) → persistent tier (file)          │
//! │  • Corrupt payload resets every tier to empty              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               (scheduler task: debounce, backoff)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Remote Cart (CartGateway)                  │
//! │  • Whole-cart replace, clear on empty                      │
//! │  • Merge on session start and on reconnect                 │
//! │  • Availability probed once per session                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cart_sync::{
//!     CartSession, CartSyncConfig, ConnectivityMonitor, DurableLocalStore,
//!     InMemoryGateway, ItemDescriptor, Seller, UserId,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = CartSyncConfig {
//!         persistent_dir: Some("/tmp/cart".into()),
//!         ..Default::default()
//!     };
//!     let local = DurableLocalStore::from_config(&config).expect("local store");
//!     let connectivity = ConnectivityMonitor::online();
//!
//!     let session = CartSession::start(
//!         config,
//!         Some(UserId::new("user-42")),
//!         local,
//!         Arc::new(InMemoryGateway::new()),
//!         connectivity.clone(),
//!     )
//!     .await;
//!
//!     session.add_item(ItemDescriptor {
//!         id: 1,
//!         title: "Charizard Holo".into(),
//!         price: 349.99,
//!         currency: "USD".into(),
//!         image: "https://img.example/1.png".into(),
//!         seller: Seller { name: "CardShack".into(), verified: true },
//!     });
//!
//!     // Synced 2s after the last change, or right now:
//!     session.sync_cart().await.expect("sync");
//!     assert!(session.is_synced());
//!
//!     session.shutdown().await;
//! }
//! ```
//!
//! ## Features
//!
//! - **Write-through local tiers**: the cart survives reloads and restarts
//! - **Debounced sync**: a burst of edits becomes one remote write
//! - **Exponential backoff**: 3s, 6s, 12s, 24s, 48s, then give up until the next change
//! - **Offline tolerance**: mutations queue locally, reconnect merges then pushes
//! - **Merge**: max quantity, latest `addedAt`, no line lost from either side
//!
//! ## Configuration
//!
//! See [`CartSyncConfig`] for all configuration options.
//!
//! ## Modules
//!
//! - [`coordinator`]: The [`CartSession`] and its sync scheduler
//! - [`cart`]: The cart collection and its mutation rules
//! - [`merge`]: Local/remote cart merge
//! - [`storage`]: Local tiers and the remote gateway contract
//! - [`connectivity`]: Online/offline state
//! - [`resilience`]: Retry and backoff policies

pub mod config;
pub mod cart_item;
pub mod cart;
pub mod merge;
pub mod connectivity;
pub mod storage;
pub mod resilience;
pub mod coordinator;
pub mod metrics;

pub use config::CartSyncConfig;
pub use cart_item::{CartItem, ItemDescriptor, ItemId, Seller, UserId};
pub use cart::{AddOutcome, Cart};
pub use merge::{MergeEngine, MergeReport};
pub use connectivity::{ConnectivityEvent, ConnectivityMonitor, NetworkState};
pub use storage::file::FileTier;
pub use storage::local::{DurableLocalStore, LocalLoad};
pub use storage::memory::{GatewayCall, InMemoryGateway, MemoryTier};
pub use storage::traits::{CartGateway, GatewayError, LocalTier, StorageError};
pub use resilience::retry::RetryConfig;
pub use coordinator::{CartEvent, CartSession, ReconcileSummary, SyncError, SyncState, SyncStatus};
