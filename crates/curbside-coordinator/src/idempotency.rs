// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Idempotency guard for session creation.
//!
//! A key is bound to a fingerprint of the request it first arrived with.
//! The same key with the same fingerprint replays the original session; the
//! same key with a different fingerprint is a conflict.

use chrono::{DateTime, Duration, Utc};
use curbside_core::traits::storage::IdempotencyRecord;
use curbside_core::{ConflictKind, CurbsideError, SessionId};
use sha2::{Digest, Sha256};

/// Longest accepted idempotency key.
pub const MAX_KEY_LEN: usize = 255;

/// SHA-256 over the fields that identify a start-session request.
pub fn fingerprint(actor_id: &str, destination_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(actor_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(destination_id.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct IdempotencyGuard {
    ttl: Duration,
}

impl IdempotencyGuard {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn validate_key(key: &str) -> Result<&str, CurbsideError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(CurbsideError::validation(
                "idempotency_key",
                "idempotency key must not be empty",
            ));
        }
        if key.len() > MAX_KEY_LEN {
            return Err(CurbsideError::validation(
                "idempotency_key",
                format!("idempotency key must be at most {MAX_KEY_LEN} bytes"),
            ));
        }
        Ok(key)
    }

    /// Session to replay for a live record, or a conflict if the record was
    /// created by a different request.
    pub fn replay(
        &self,
        record: &IdempotencyRecord,
        fingerprint: &str,
    ) -> Result<SessionId, CurbsideError> {
        if record.fingerprint == fingerprint {
            Ok(record.session_id.clone())
        } else {
            Err(CurbsideError::conflict(
                ConflictKind::IdempotencyKeyReused,
                "idempotency key was already used for a different request",
            ))
        }
    }

    /// Record binding `key` to a freshly created session.
    pub fn record(
        &self,
        key: &str,
        session_id: &SessionId,
        fingerprint: String,
        now: DateTime<Utc>,
    ) -> IdempotencyRecord {
        IdempotencyRecord {
            key: key.to_string(),
            session_id: session_id.clone(),
            fingerprint,
            created_at: now,
            expires_at: now + self.ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_separates_fields() {
        assert_eq!(fingerprint("a", "b"), fingerprint("a", "b"));
        assert_ne!(fingerprint("ab", "c"), fingerprint("a", "bc"));
        assert_eq!(fingerprint("a", "b").len(), 64);
    }

    #[test]
    fn replay_requires_matching_fingerprint() {
        let guard = IdempotencyGuard::new(Duration::hours(24));
        let now = Utc::now();
        let record = guard.record("K1", &SessionId("s1".into()), fingerprint("alice", "D"), now);
        assert_eq!(record.expires_at, now + Duration::hours(24));

        assert_eq!(
            guard.replay(&record, &fingerprint("alice", "D")).unwrap().as_str(),
            "s1"
        );
        let err = guard.replay(&record, &fingerprint("alice", "E")).unwrap_err();
        assert!(matches!(
            err,
            CurbsideError::Conflict {
                kind: ConflictKind::IdempotencyKeyReused,
                ..
            }
        ));
    }

    #[test]
    fn keys_are_trimmed_and_bounded() {
        assert_eq!(IdempotencyGuard::validate_key("  K1 ").unwrap(), "K1");
        assert!(IdempotencyGuard::validate_key("   ").is_err());
        assert!(IdempotencyGuard::validate_key(&"k".repeat(256)).is_err());
    }
}
