//! Signed quota record.
//!
//! A plain data struct plus a pure checksum over its payload fields. The
//! checksum keys on a fixed static salt: it deters manual edits of the
//! persisted counter, it is not a security boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const CHECKSUM_SALT: &str = "sommelier.quota.v1";
const CHECKSUM_LEN: usize = 16;

/// Usage counter bound to one fingerprint for one time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuotaRecord {
    pub count: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub window_start: DateTime<Utc>,
    pub fingerprint: String,
    pub checksum: String,
}

impl QuotaRecord {
    /// Creates a zero-count record whose window opens at `now`.
    pub fn fresh(fingerprint: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self::signed(0, now, fingerprint.into())
    }

    /// Builds a record with its checksum already computed.
    pub fn signed(count: u32, window_start: DateTime<Utc>, fingerprint: String) -> Self {
        let checksum = compute_checksum(count, window_start, &fingerprint);
        Self {
            count,
            window_start,
            fingerprint,
            checksum,
        }
    }

    /// Returns the record with one more use counted and the checksum recomputed.
    pub fn incremented(&self) -> Self {
        Self::signed(
            self.count.saturating_add(1),
            self.window_start,
            self.fingerprint.clone(),
        )
    }

    /// Checks the stored checksum against the payload.
    pub fn verify(&self) -> bool {
        self.checksum == compute_checksum(self.count, self.window_start, &self.fingerprint)
    }
}

/// Deterministic checksum over `(count, window_start, fingerprint)`.
pub fn compute_checksum(count: u32, window_start: DateTime<Utc>, fingerprint: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(count.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(window_start.timestamp_millis().to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(fingerprint.as_bytes());
    hasher.update(b"|");
    hasher.update(CHECKSUM_SALT.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..CHECKSUM_LEN].to_string()
}
