//! Resilience: backoff for remote cart calls.

pub mod retry;
