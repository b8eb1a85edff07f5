//! Durable local store: the cart written through an ordered list of tiers.
//!
//! Every mutation serializes the whole cart and writes it to every tier.
//! Loading walks the tiers in priority order and takes the first payload
//! found. A corrupt payload wipes every tier and yields an empty cart; that
//! recovery is logged, never raised.

use tracing::{debug, info, warn};

use crate::cart::Cart;
use crate::cart_item::CartItem;
use crate::config::CartSyncConfig;
use super::file::FileTier;
use super::memory::MemoryTier;
use super::traits::{LocalTier, StorageError};

/// What [`DurableLocalStore::load`] found.
#[derive(Debug, Clone, Default)]
pub struct LocalLoad {
    pub cart: Cart,
    /// Tier the cart came from, if any held a payload
    pub tier: Option<String>,
    /// A corrupt payload was discarded
    pub recovered: bool,
}

pub struct DurableLocalStore {
    key: String,
    /// Highest priority first
    tiers: Vec<Box<dyn LocalTier>>,
}

impl DurableLocalStore {
    /// Create a store over `tiers`, highest load priority first.
    pub fn new(key: impl Into<String>, tiers: Vec<Box<dyn LocalTier>>) -> Self {
        Self {
            key: key.into(),
            tiers,
        }
    }

    /// Standard layout: session memory first, then the on-disk tier when
    /// `persistent_dir` is configured.
    pub fn from_config(config: &CartSyncConfig) -> Result<Self, StorageError> {
        let mut tiers: Vec<Box<dyn LocalTier>> = vec![Box::new(MemoryTier::new())];
        if let Some(dir) = &config.persistent_dir {
            tiers.push(Box::new(FileTier::open(dir)?));
        }
        Ok(Self::new(config.storage_key.clone(), tiers))
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn tier_names(&self) -> Vec<String> {
        self.tiers.iter().map(|t| t.name().to_string()).collect()
    }

    /// Write the full cart to every tier. An empty cart clears the tiers.
    ///
    /// A failing tier is logged and skipped so the others still get the write;
    /// the first error is returned.
    pub fn persist(&self, cart: &Cart) -> Result<(), StorageError> {
        if cart.is_empty() {
            return self.clear();
        }

        let payload = serde_json::to_string(cart.items())
            .map_err(|e| StorageError::Backend(format!("cart serialization failed: {}", e)))?;

        let mut first_error = None;
        for tier in &self.tiers {
            if let Err(e) = tier.write(&self.key, &payload) {
                warn!(tier = tier.name(), error = %e, "Failed to write cart to local tier");
                crate::metrics::record_local_write_error(tier.name());
                first_error.get_or_insert(e);
            }
        }
        debug!(items = cart.len(), bytes = payload.len(), "Cart persisted locally");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Remove the cart from every tier.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut first_error = None;
        for tier in &self.tiers {
            if let Err(e) = tier.remove(&self.key) {
                warn!(tier = tier.name(), error = %e, "Failed to clear local tier");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Load the cart from the highest-priority tier holding one.
    pub fn load(&self) -> LocalLoad {
        for tier in &self.tiers {
            let payload = match tier.read(&self.key) {
                Ok(Some(payload)) => payload,
                Ok(None) => continue,
                Err(e) => {
                    warn!(tier = tier.name(), error = %e, "Local tier unreadable, trying next");
                    continue;
                }
            };

            return match Self::decode(tier.name(), &payload) {
                Ok(cart) => {
                    info!(tier = tier.name(), items = cart.len(), "Loaded cart from local tier");
                    LocalLoad {
                        cart,
                        tier: Some(tier.name().to_string()),
                        recovered: false,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Discarding corrupt local cart, starting empty");
                    crate::metrics::record_local_recovery(tier.name());
                    // Best effort: a tier that can't be cleared is already logged
                    let _ = self.clear();
                    LocalLoad {
                        cart: Cart::new(),
                        tier: None,
                        recovered: true,
                    }
                }
            };
        }

        LocalLoad::default()
    }

    fn decode(tier: &str, payload: &str) -> Result<Cart, StorageError> {
        let items: Vec<CartItem> = serde_json::from_str(payload).map_err(|source| StorageError::Corrupt {
            tier: tier.to_string(),
            source,
        })?;
        Ok(Cart::from_items(items))
    }
}
