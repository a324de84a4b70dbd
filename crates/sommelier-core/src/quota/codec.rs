//! Reversible obfuscation of the persisted quota blob.
//!
//! Layers: JSON, then XOR with a static key, then base64. Decoding fails
//! as a whole if any layer fails; validation of the decoded record is a
//! separate step (see [`super::record::QuotaRecord::verify`]).

use super::record::QuotaRecord;
use crate::error::{Result, SommelierError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;

const OBFUSCATION_KEY: &[u8] = b"s0mm3l13r-cellar-key";

/// Serializes and obfuscates a record into a single self-contained blob.
pub fn encode(record: &QuotaRecord) -> Result<String> {
    let json = serde_json::to_vec(record)?;
    Ok(BASE64_STANDARD.encode(xor(&json)))
}

/// Reverses [`encode`].
pub fn decode(blob: &str) -> Result<QuotaRecord> {
    let bytes = BASE64_STANDARD.decode(blob.trim())?;
    let json = xor(&bytes);
    serde_json::from_slice(&json).map_err(SommelierError::from)
}

fn xor(data: &[u8]) -> Vec<u8> {
    data.iter()
        .zip(OBFUSCATION_KEY.iter().cycle())
        .map(|(b, k)| b ^ k)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record() -> QuotaRecord {
        QuotaRecord::fresh("fp_abc", Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap())
            .incremented()
    }

    #[test]
    fn test_blob_is_not_plain_json() {
        let blob = encode(&record()).unwrap();
        assert!(!blob.contains("count"));
        assert!(!blob.contains("fp_abc"));
        assert_eq!(decode(&blob).unwrap(), record());
    }

    #[test]
    fn test_garbage_blob_is_rejected() {
        assert!(decode("not base64 at all!").is_err());
        assert!(decode(&BASE64_STANDARD.encode(b"plain")).is_err());
    }
}
