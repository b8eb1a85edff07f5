//! Storage: local persistence tiers and the remote cart gateway.

pub mod file;
pub mod local;
pub mod memory;
pub mod traits;
