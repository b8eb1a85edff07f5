// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry logic with exponential backoff.
//!
//! Two shapes of retry live here:
//! - [`RetryConfig::delay_for`] gives the sync scheduler its backoff ladder.
//!   The scheduler owns the timer itself so a retry can be suspended while
//!   offline or superseded by a manual sync.
//! - [`retry`] is a self-contained loop for one-off operations (the remote
//!   fetch that precedes a merge).
//!
//! # Example
//!
//! ```
//! use cart_sync::RetryConfig;
//! use std::time::Duration;
//!
//! // Cart sync ladder: 3s, 6s, 12s, 24s, 48s, then give up
//! let ladder = RetryConfig::cart_sync();
//! assert_eq!(ladder.delay_for(1), Duration::from_secs(3));
//! assert_eq!(ladder.delay_for(5), Duration::from_secs(48));
//! assert_eq!(ladder.next_retry(6), None);
//!
//! // Query: quick retry, then fail
//! let query = RetryConfig::query();
//! assert_eq!(query.max_retries, Some(3));
//! ```

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Configuration for operation retry behavior.
///
/// Use the preset constructors for common patterns:
/// - [`RetryConfig::cart_sync()`] - Backoff ladder for remote cart saves
/// - [`RetryConfig::query()`] - Quick retry for individual reads
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    pub max_retries: Option<usize>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::cart_sync()
    }
}

impl RetryConfig {
    /// Backoff for remote cart saves: base 3s doubling, 5 automatic retries.
    #[must_use]
    pub fn cart_sync() -> Self {
        Self::ladder(Duration::from_secs(3), 2.0, 5)
    }

    /// Ladder of `max_retries` rungs from `initial_delay`, growing by `factor`.
    /// `max_delay` is the last rung.
    #[must_use]
    pub fn ladder(initial_delay: Duration, factor: f64, max_retries: u32) -> Self {
        Self {
            max_retries: Some(max_retries as usize),
            initial_delay,
            max_delay: initial_delay.mul_f64(factor.powi(max_retries.saturating_sub(1) as i32)),
            factor,
        }
    }

    /// Quick retry for individual queries (don't block forever).
    /// 3 attempts with fast backoff - if it fails, let caller handle it.
    #[must_use]
    pub fn query() -> Self {
        Self {
            max_retries: Some(3),
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            factor: 2.0,
        }
    }

    /// Fast retry for tests (minimal delays)
    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            max_retries: Some(3),
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            factor: 2.0,
        }
    }

    /// Delay before retry number `retry_count` (1-based): `initial * factor^(n-1)`,
    /// capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.saturating_sub(1) as i32;
        self.initial_delay
            .mul_f64(self.factor.powi(exponent))
            .min(self.max_delay)
    }

    /// Delay for retry `retry_count`, or `None` once the ceiling is exceeded.
    #[must_use]
    pub fn next_retry(&self, retry_count: u32) -> Option<Duration> {
        match self.max_retries {
            Some(max) if retry_count as usize > max => None,
            _ => Some(self.delay_for(retry_count)),
        }
    }
}

/// Run `operation` until it succeeds or `config.max_retries` attempts have failed.
pub async fn retry<F, Fut, T, E>(
    operation_name: &str,
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = config.initial_delay;
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(val) => {
                if attempts > 0 {
                    info!("Operation '{}' succeeded after {} retries", operation_name, attempts);
                }
                return Ok(val);
            }
            Err(err) => {
                attempts += 1;

                match config.max_retries {
                    Some(max) if attempts >= max => return Err(err),
                    Some(max) => warn!(
                        "Operation '{}' failed (attempt {}/{}): {}. Retrying in {:?}...",
                        operation_name, attempts, max, err, delay
                    ),
                    None => warn!(
                        "Operation '{}' failed (attempt {}, will retry forever): {}. Next retry in {:?}...",
                        operation_name, attempts, err, delay
                    ),
                }

                sleep(delay).await;
                delay = (delay.mul_f64(config.factor)).min(config.max_delay);
            }
        }
    }
}
