//! Lease types for the distributed lock
//!
//! A lease is a time-bounded exclusive claim on a named resource. Expiry is
//! decided by comparing `expiresAt` against the store's own clock at each
//! decision point, so a crashed holder self-heals once its TTL elapses.

use serde::{Deserialize, Serialize};

/// An exclusive, TTL-bounded claim on a resource key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lease {
    /// Unique resource name, e.g. "batch-approval" or "ocr-rate-limit"
    #[serde(rename = "resourceKey")]
    pub resource_key: String,

    /// Token identifying the current owner; required for release/extend
    #[serde(rename = "ownerToken")]
    pub owner_token: String,

    /// Unix millis when the lease was granted
    #[serde(rename = "acquiredAt")]
    pub acquired_at: i64,

    /// Unix millis past which the lease no longer confers exclusivity
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
}

impl Lease {
    /// Whether the lease has expired as of `now_ms`
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at <= now_ms
    }
}

/// Outcome of an acquire attempt
#[derive(Debug, Clone, Serialize)]
pub struct LeaseGrant {
    /// Whether this caller won the lease
    pub acquired: bool,

    /// The owner token to use for release/extend (present iff acquired)
    #[serde(rename = "ownerToken", skip_serializing_if = "Option::is_none")]
    pub owner_token: Option<String>,

    /// When the lease (ours, or the competing holder's) expires
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
}

impl LeaseGrant {
    /// The caller now holds the lease
    pub fn granted(owner_token: String, expires_at: i64) -> Self {
        Self {
            acquired: true,
            owner_token: Some(owner_token),
            expires_at,
        }
    }

    /// Someone else holds a live lease until `expires_at`
    pub fn denied(expires_at: i64) -> Self {
        Self {
            acquired: false,
            owner_token: None,
            expires_at,
        }
    }
}
