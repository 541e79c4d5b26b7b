//! Webhook signature verification and replay protection.
//!
//! Signatures are HMAC-SHA256 over the exact raw request bytes. A parsed and
//! re-serialized body can change byte layout, so callers must pass the body
//! as received.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::ConfigError;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted webhook age in seconds.
pub const DEFAULT_MAX_AGE_SECS: i64 = 300;
/// Tolerated forward clock skew in seconds.
pub const MAX_FUTURE_SKEW_SECS: i64 = 60;

/// Freshness verdict for an event timestamp. Stale and future-dated events
/// are distinct rejection reasons for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampVerdict {
    /// Within the accepted window.
    Fresh,
    /// Older than the maximum age; possible replay.
    Stale,
    /// Further in the future than the skew tolerance.
    FutureDated,
}

impl TimestampVerdict {
    /// Whether the event should be accepted.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh)
    }
}

/// Classifies an event timestamp against the replay window.
#[must_use]
pub fn timestamp_verdict(
    event_time: DateTime<Utc>,
    now: DateTime<Utc>,
    max_age_secs: i64,
) -> TimestampVerdict {
    if event_time > now + Duration::seconds(MAX_FUTURE_SKEW_SECS) {
        TimestampVerdict::FutureDated
    } else if now - event_time > Duration::seconds(max_age_secs) {
        TimestampVerdict::Stale
    } else {
        TimestampVerdict::Fresh
    }
}

/// Convenience wrapper over [`timestamp_verdict`] with the default window.
#[must_use]
pub fn is_timestamp_fresh(event_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    timestamp_verdict(event_time, now, DEFAULT_MAX_AGE_SECS).is_fresh()
}

/// Verifies HMAC-SHA256 webhook signatures for one provider's shared secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
}

impl SignatureVerifier {
    /// Creates a verifier. An empty secret is a fatal configuration error,
    /// not something to fall back from at request time.
    pub fn new(provider: &str, secret: &str) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::EmptyWebhookSecret(provider.to_string()));
        }
        Ok(Self { secret: secret.as_bytes().to_vec() })
    }

    /// Verifies a hex-encoded signature against the raw body. Fails closed:
    /// a missing, empty or undecodable signature is rejected. The comparison
    /// is constant-time via the `Mac` verification path.
    #[must_use]
    pub fn verify(&self, raw_body: &[u8], signature: &str) -> bool {
        let signature = signature.trim();
        if signature.is_empty() {
            return false;
        }
        let Ok(claimed) = hex::decode(signature) else {
            return false;
        };
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(raw_body);
        mac.verify_slice(&claimed).is_ok()
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secret.
        f.debug_struct("SignatureVerifier").finish_non_exhaustive()
    }
}
