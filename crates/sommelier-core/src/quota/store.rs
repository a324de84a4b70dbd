//! Tamper-evident quota store.
//!
//! Enforces "at most N uses per window W" for one fingerprint on top of a
//! [`KeyValueStore`]. The read-modify-write cycle is not coordinated across
//! processes sharing the same storage: the last writer wins, so K concurrent
//! writers may overshoot the limit by up to K - 1 uses.

use super::codec;
use super::record::QuotaRecord;
use super::{RateLimitDecision, RateLimitInfo};
use crate::clock::Clock;
use crate::config::QuotaSettings;
use crate::storage::KeyValueStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Storage key holding the obfuscated [`QuotaRecord`].
pub const QUOTA_KEY: &str = "sommelier.quota";
/// Storage key holding the raw fingerprint the record was written for.
pub const FINGERPRINT_KEY: &str = "sommelier.fingerprint";

/// Owns the persisted quota record for one fingerprint.
pub struct QuotaStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    fingerprint: String,
    settings: QuotaSettings,
}

impl QuotaStore {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        fingerprint: impl Into<String>,
        settings: QuotaSettings,
    ) -> Self {
        Self {
            store,
            clock,
            fingerprint: fingerprint.into(),
            settings,
        }
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn limit(&self) -> u32 {
        self.settings.limit
    }

    /// Consumes one unit of quota if any is left.
    ///
    /// Only an allowed call writes to storage.
    pub fn check_and_consume(&self) -> RateLimitDecision {
        let now = self.clock.now();
        let record = self.active_record(now);
        let reset_in = self.reset_in(&record, now);

        if record.count >= self.settings.limit {
            debug!(
                used = record.count,
                limit = self.settings.limit,
                "Quota exhausted"
            );
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_in,
            };
        }

        let next = record.incremented();
        self.persist(&next);

        RateLimitDecision {
            allowed: true,
            remaining: self.settings.limit.saturating_sub(next.count),
            reset_in,
        }
    }

    /// Reports usage without touching storage.
    pub fn peek(&self) -> RateLimitInfo {
        let now = self.clock.now();
        let record = self.active_record(now);
        RateLimitInfo {
            used: record.count,
            limit: self.settings.limit,
            reset_in: self.reset_in(&record, now),
        }
    }

    /// Loads the stored record, or a fresh one when it is absent, invalid,
    /// or its window has elapsed.
    fn active_record(&self, now: DateTime<Utc>) -> QuotaRecord {
        match self.load() {
            Some(record) if !self.is_expired(&record, now) => record,
            Some(_) => {
                debug!("Quota window elapsed, starting a new one");
                QuotaRecord::fresh(self.fingerprint.clone(), now)
            }
            None => QuotaRecord::fresh(self.fingerprint.clone(), now),
        }
    }

    fn load(&self) -> Option<QuotaRecord> {
        let blob = match self.store.get(QUOTA_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = %err, "Failed to read quota record, treating as absent");
                return None;
            }
        };

        match self.store.get(FINGERPRINT_KEY) {
            Ok(Some(stored)) if stored != self.fingerprint => {
                debug!("Stored fingerprint differs from current device");
                return None;
            }
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "Failed to read stored fingerprint");
            }
        }

        let record = match codec::decode(&blob) {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "Quota record could not be decoded, discarding");
                return None;
            }
        };

        if !record.verify() {
            warn!("Quota record checksum mismatch, discarding");
            return None;
        }

        if record.fingerprint != self.fingerprint {
            debug!("Quota record belongs to another fingerprint");
            return None;
        }

        Some(record)
    }

    fn persist(&self, record: &QuotaRecord) {
        let blob = match codec::encode(record) {
            Ok(blob) => blob,
            Err(err) => {
                warn!(error = %err, "Failed to encode quota record");
                return;
            }
        };

        // Two independent writes; there is no transaction spanning both keys.
        if let Err(err) = self.store.set(QUOTA_KEY, &blob) {
            warn!(error = %err, "Failed to persist quota record");
        }
        if let Err(err) = self.store.set(FINGERPRINT_KEY, &self.fingerprint) {
            warn!(error = %err, "Failed to persist fingerprint");
        }
    }

    fn is_expired(&self, record: &QuotaRecord, now: DateTime<Utc>) -> bool {
        // A window that starts in the future can only come from clock skew or editing.
        match now.signed_duration_since(record.window_start).to_std() {
            Ok(elapsed) => elapsed > self.settings.window(),
            Err(_) => true,
        }
    }

    fn reset_in(&self, record: &QuotaRecord, now: DateTime<Utc>) -> Duration {
        let elapsed = now
            .signed_duration_since(record.window_start)
            .to_std()
            .unwrap_or(Duration::ZERO);
        self.settings.window().saturating_sub(elapsed)
    }
}
