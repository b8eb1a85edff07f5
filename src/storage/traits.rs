use async_trait::async_trait;
use crate::cart_item::{CartItem, UserId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Local tier I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt cart payload in tier '{tier}': {source}")]
    Corrupt {
        tier: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Remote cart storage is not provisioned for this account
    #[error("Remote cart storage unavailable")]
    Unavailable,
    /// Network error, timeout, or similar transient failure
    #[error("Transport error: {0}")]
    Transport(String),
    /// The remote answered but refused the operation
    #[error("Remote rejected request: {0}")]
    Rejected(String),
}

/// One local persistence tier holding the serialized cart.
///
/// Tier operations are synchronous: a cart mutation writes through every
/// tier before it returns.
pub trait LocalTier: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Raw payload stored under `key`, if any.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn write(&self, key: &str, payload: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Server-side cart storage keyed by user.
///
/// Every save is a full-state overwrite.
#[async_trait]
pub trait CartGateway: Send + Sync {
    async fn fetch_cart(&self, user: &UserId) -> Result<Vec<CartItem>, GatewayError>;
    async fn save_cart(&self, user: &UserId, items: &[CartItem]) -> Result<(), GatewayError>;
    async fn clear_cart(&self, user: &UserId) -> Result<(), GatewayError>;

    /// One-time probe run at session start. `Ok(false)` means remote sync is
    /// not provisioned and should never be attempted.
    async fn check_availability(&self) -> Result<bool, GatewayError>;
}
