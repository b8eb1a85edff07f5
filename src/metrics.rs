// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for cart sync.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding application chooses the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `cart_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `operation`: save, clear, fetch
//! - `status`: success, error, skipped
//! - `tier`: local tier name

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record a remote sync attempt outcome
pub fn record_sync_attempt(operation: &str, status: &str) {
    counter!(
        "cart_sync_attempts_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record remote call latency
pub fn record_sync_latency(operation: &str, duration: Duration) {
    histogram!(
        "cart_sync_remote_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record a scheduled backoff retry
pub fn record_retry_scheduled(retry_count: u32, delay: Duration) {
    counter!("cart_sync_retries_total").increment(1);
    histogram!("cart_sync_retry_delay_seconds").record(delay.as_secs_f64());
    gauge!("cart_sync_retry_count").set(f64::from(retry_count));
}

/// Record a sync cycle that ran out of retries
pub fn record_retries_exhausted() {
    counter!("cart_sync_retries_exhausted_total").increment(1);
}

/// Set whether local state differs from the last confirmed remote state
pub fn set_pending_changes(pending: bool) {
    gauge!("cart_sync_pending_changes").set(if pending { 1.0 } else { 0.0 });
}

/// Record a corrupt local payload that was discarded
pub fn record_local_recovery(tier: &str) {
    counter!(
        "cart_sync_local_recoveries_total",
        "tier" => tier.to_string()
    )
    .increment(1);
}

/// Record a failed local tier write
pub fn record_local_write_error(tier: &str) {
    counter!(
        "cart_sync_local_write_errors_total",
        "tier" => tier.to_string()
    )
    .increment(1);
}

/// Record merge shape
pub fn record_merge(remote_only: usize, local_only: usize, combined: usize) {
    counter!("cart_sync_merges_total").increment(1);
    histogram!("cart_sync_merge_local_only_items").record(local_only as f64);
    histogram!("cart_sync_merge_remote_only_items").record(remote_only as f64);
    histogram!("cart_sync_merge_combined_items").record(combined as f64);
}

/// Record a cart mutation from the UI
pub fn record_mutation(kind: &str) {
    counter!(
        "cart_sync_mutations_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}
