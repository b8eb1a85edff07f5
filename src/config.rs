//! Configuration for a cart session.
//!
//! # Example
//!
//! ```
//! use cart_sync::CartSyncConfig;
//! use std::time::Duration;
//!
//! // Minimal config (uses defaults)
//! let config = CartSyncConfig::default();
//! assert_eq!(config.debounce(), Duration::from_secs(2));
//! assert_eq!(config.max_retries, 5);
//!
//! // Tighter timings, persistent tier on disk
//! let config = CartSyncConfig {
//!     debounce_ms: 500,
//!     persistent_dir: Some("/var/lib/shop".into()),
//!     ..Default::default()
//! };
//! assert_eq!(config.retry_config().delay_for(1), Duration::from_secs(3));
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::resilience::retry::RetryConfig;

/// Configuration for the cart sync engine.
///
/// All fields have sensible defaults matching the storefront's behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct CartSyncConfig {
    /// Quiet period after the last mutation before a remote save (default: 2s)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Backoff base delay for failed syncs (default: 3s)
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    #[serde(default = "default_retry_factor")]
    pub retry_factor: f64,

    /// Automatic retries per sync cycle before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Window for "recently added" items (default: 5 minutes)
    #[serde(default = "default_recent_window_secs")]
    pub recent_window_secs: u64,

    /// Key the cart is stored under in every local tier
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Directory for the long-lived local tier. `None` keeps the cart in memory only.
    #[serde(default)]
    pub persistent_dir: Option<String>,

    /// Attempts for the remote fetch that precedes a merge
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: usize,

    /// Capacity of the notification channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_debounce_ms() -> u64 { 2_000 }
fn default_retry_base_ms() -> u64 { 3_000 }
fn default_retry_factor() -> f64 { 2.0 }
fn default_max_retries() -> u32 { 5 }
fn default_recent_window_secs() -> u64 { 5 * 60 }
fn default_storage_key() -> String { "eceCart".to_string() }
fn default_fetch_retries() -> usize { 3 }
fn default_event_buffer() -> usize { 64 }

impl Default for CartSyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            retry_base_ms: default_retry_base_ms(),
            retry_factor: default_retry_factor(),
            max_retries: default_max_retries(),
            recent_window_secs: default_recent_window_secs(),
            storage_key: default_storage_key(),
            persistent_dir: None,
            fetch_retries: default_fetch_retries(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl CartSyncConfig {
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub fn recent_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.recent_window_secs as i64)
    }

    /// Backoff ladder for the sync scheduler. The defaults give
    /// [`RetryConfig::cart_sync`].
    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::ladder(
            Duration::from_millis(self.retry_base_ms),
            self.retry_factor,
            self.max_retries,
        )
    }

    /// Short-fuse retry used for the merge-time fetch.
    #[must_use]
    pub fn fetch_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: Some(self.fetch_retries.max(1)),
            ..RetryConfig::query()
        }
    }
}
