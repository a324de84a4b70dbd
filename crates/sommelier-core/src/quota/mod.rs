//! Per-device usage quota.
//!
//! - `record`: the signed [`QuotaRecord`] and its checksum
//! - `codec`: reversible obfuscation of the persisted blob
//! - `store`: [`QuotaStore`], the window/limit policy over a key-value store

pub mod codec;
mod record;
mod store;

pub use record::{QuotaRecord, compute_checksum};
pub use store::{FINGERPRINT_KEY, QUOTA_KEY, QuotaStore};

use serde::Serialize;
use std::time::Duration;

/// Outcome of [`QuotaStore::check_and_consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_in: Duration,
}

/// Read-only usage snapshot from [`QuotaStore::peek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitInfo {
    pub used: u32,
    pub limit: u32,
    pub reset_in: Duration,
}

impl RateLimitInfo {
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }
}
