use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::cart_item::{CartItem, UserId};
use super::traits::{CartGateway, GatewayError, LocalTier, StorageError};

/// Session-scoped local tier: lives exactly as long as the process.
pub struct MemoryTier {
    name: String,
    data: DashMap<String, String>,
}

impl MemoryTier {
    #[must_use]
    pub fn new() -> Self {
        Self::named("session")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: DashMap::new(),
        }
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Default for MemoryTier {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalTier for MemoryTier {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.data.get(key).map(|r| r.value().clone()))
    }

    fn write(&self, key: &str, payload: &str) -> Result<(), StorageError> {
        self.data.insert(key.to_string(), payload.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.data.remove(key);
        Ok(())
    }
}

/// A remote call observed by [`InMemoryGateway`].
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Fetch,
    Save(Vec<CartItem>),
    Clear,
}

/// In-process [`CartGateway`] for tests, demos and offline-first embedding.
///
/// Availability can be toggled and failures injected; every call is logged
/// with the (tokio) instant it arrived.
pub struct InMemoryGateway {
    carts: DashMap<UserId, Vec<CartItem>>,
    provisioned: AtomicBool,
    /// Remaining calls to fail (u32::MAX = fail forever)
    failures_remaining: AtomicU32,
    calls: Mutex<Vec<(Instant, GatewayCall)>>,
    saves: AtomicU64,
    clears: AtomicU64,
}

impl InMemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self {
            carts: DashMap::new(),
            provisioned: AtomicBool::new(true),
            failures_remaining: AtomicU32::new(0),
            calls: Mutex::new(Vec::new()),
            saves: AtomicU64::new(0),
            clears: AtomicU64::new(0),
        }
    }

    /// Gateway whose availability probe reports "not provisioned".
    #[must_use]
    pub fn unprovisioned() -> Self {
        let gateway = Self::new();
        gateway.provisioned.store(false, Ordering::Release);
        gateway
    }

    /// Seed a user's remote cart without recording a call.
    pub fn seed(&self, user: &UserId, items: Vec<CartItem>) {
        self.carts.insert(user.clone(), items);
    }

    /// Stored remote cart for `user`.
    #[must_use]
    pub fn stored(&self, user: &UserId) -> Option<Vec<CartItem>> {
        self.carts.get(user).map(|r| r.value().clone())
    }

    /// Fail the next `count` calls with a transport error.
    pub fn fail_next(&self, count: u32) {
        self.failures_remaining.store(count, Ordering::Release);
    }

    pub fn fail_always(&self) {
        self.failures_remaining.store(u32::MAX, Ordering::Release);
    }

    pub fn recover(&self) {
        self.failures_remaining.store(0, Ordering::Release);
    }

    #[must_use]
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn clear_count(&self) -> u64 {
        self.clears.load(Ordering::Acquire)
    }

    /// All calls so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<(Instant, GatewayCall)> {
        self.calls.lock().clone()
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().push((Instant::now(), call));
    }

    fn check_failure(&self) -> Result<(), GatewayError> {
        if !self.provisioned.load(Ordering::Acquire) {
            return Err(GatewayError::Unavailable);
        }
        let outcome = self.failures_remaining.fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |left| match left {
                0 => None,
                u32::MAX => Some(u32::MAX),
                n => Some(n - 1),
            },
        );
        match outcome {
            Ok(_) => Err(GatewayError::Transport("injected failure".into())),
            Err(_) => Ok(()),
        }
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CartGateway for InMemoryGateway {
    async fn fetch_cart(&self, user: &UserId) -> Result<Vec<CartItem>, GatewayError> {
        self.record(GatewayCall::Fetch);
        self.check_failure()?;
        Ok(self.stored(user).unwrap_or_default())
    }

    async fn save_cart(&self, user: &UserId, items: &[CartItem]) -> Result<(), GatewayError> {
        self.record(GatewayCall::Save(items.to_vec()));
        self.saves.fetch_add(1, Ordering::AcqRel);
        self.check_failure()?;
        self.carts.insert(user.clone(), items.to_vec());
        Ok(())
    }

    async fn clear_cart(&self, user: &UserId) -> Result<(), GatewayError> {
        self.record(GatewayCall::Clear);
        self.clears.fetch_add(1, Ordering::AcqRel);
        self.check_failure()?;
        self.carts.remove(user);
        Ok(())
    }

    async fn check_availability(&self) -> Result<bool, GatewayError> {
        Ok(self.provisioned.load(Ordering::Acquire))
    }
}
