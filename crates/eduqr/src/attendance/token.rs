//! Opaque attendance tokens.
//!
//! A token is the URL-safe base64 encoding of a small JSON document naming the
//! course, a 256-bit random nonce and the issue time. Nothing is stored server
//! side and the token is not signed: its validity is decided by the course's
//! time window when it is presented.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::SchedulingError;

const NONCE_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceToken {
    pub course_id: i64,
    /// Random nonce, base64 encoded
    #[serde(rename = "token")]
    pub nonce: String,
    /// Issue time, seconds since the epoch
    pub timestamp: i64,
}

impl AttendanceToken {
    pub fn issue(course_id: i64, now: DateTime<Utc>) -> Self {
        let mut nonce = [0u8; NONCE_BYTES];
        rand::thread_rng().fill_bytes(&mut nonce);
        Self {
            course_id,
            nonce: URL_SAFE_NO_PAD.encode(nonce),
            timestamp: now.timestamp(),
        }
    }

    /// The string handed to clients (and put in the QR code)
    pub fn encode(&self) -> Result<String, SchedulingError> {
        let json = serde_json::to_vec(self)
            .map_err(|e| SchedulingError::invalid_request(format!("token encoding failed: {e}")))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Parses a token string. Any malformed input is `TokenInvalid`.
    pub fn decode(raw: &str) -> Result<Self, SchedulingError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(raw.trim().trim_end_matches('='))
            .map_err(|_| SchedulingError::TokenInvalid)?;
        let token: AttendanceToken =
            serde_json::from_slice(&bytes).map_err(|_| SchedulingError::TokenInvalid)?;
        if token.nonce.is_empty() {
            return Err(SchedulingError::TokenInvalid);
        }
        Ok(token)
    }
}

/// Short hash of a token string, safe to put in logs.
pub fn fingerprint(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::at;

    #[test]
    fn test_issued_tokens_are_unique() {
        let now = at(2024, 9, 2, 8, 0);
        let a = AttendanceToken::issue(5, now);
        let b = AttendanceToken::issue(5, now);
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.encode().unwrap(), b.encode().unwrap());
    }

    #[test]
    fn test_decode_reads_issued_fields() {
        let issued = AttendanceToken::issue(42, at(2024, 9, 2, 8, 0));
        let decoded = AttendanceToken::decode(&issued.encode().unwrap()).unwrap();
        assert_eq!(decoded.course_id, 42);
        assert_eq!(decoded.timestamp, at(2024, 9, 2, 8, 0).timestamp());
    }

    #[test]
    fn test_garbage_is_token_invalid() {
        let missing_nonce = URL_SAFE_NO_PAD.encode(b"{\"course_id\": 1}");
        for raw in ["", "not base64 !!", missing_nonce.as_str()] {
            assert!(matches!(
                AttendanceToken::decode(raw),
                Err(SchedulingError::TokenInvalid)
            ));
        }
    }

    #[test]
    fn test_fingerprint_is_short_and_stable() {
        let fp = fingerprint("abc");
        assert_eq!(fp.len(), 16);
        assert_eq!(fp, fingerprint("abc"));
        assert_ne!(fp, fingerprint("abd"));
    }
}
