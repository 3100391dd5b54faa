//! Queued event types
//!
//! Events decouple slow or unreliable side-effects from the request path.
//! An event is claimable iff it is not processed, its `availableAt` has
//! passed, and no worker holds a live claim on it. Delivery is at-least-once:
//! a crashed worker's claim expires and the event becomes reclaimable, so
//! consumers must be idempotent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A durable queue entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedEvent {
    /// Sequential event id, assigned by the store on publish
    #[serde(rename = "eventId")]
    pub event_id: u64,

    /// Consumer routing key, e.g. "notify" or "audit"
    #[serde(rename = "eventType")]
    pub event_type: String,

    /// Producer-supplied payload
    pub payload: Value,

    /// Unix millis when the event was published
    #[serde(rename = "createdAt")]
    pub created_at: i64,

    /// Earliest Unix millis at which the event may be claimed
    #[serde(rename = "availableAt")]
    pub available_at: i64,

    /// Claim expiry; a claim past this instant no longer excludes others
    #[serde(rename = "lockedUntil", default, skip_serializing_if = "Option::is_none")]
    pub locked_until: Option<i64>,

    /// Worker currently holding the claim
    #[serde(rename = "lockedBy", default, skip_serializing_if = "Option::is_none")]
    pub locked_by: Option<String>,

    /// Number of claims so far (incremented atomically on each claim)
    #[serde(default)]
    pub attempts: u32,

    /// Dead-letter threshold: once attempts reach this, a failure is permanent
    #[serde(rename = "maxRetries")]
    pub max_retries: u32,

    /// Higher claims first; ties broken by creation order
    #[serde(default)]
    pub priority: i32,

    /// Terminal flag: completed or dead-lettered
    #[serde(default)]
    pub processed: bool,

    /// Set together with `processed` when the event dead-letters
    #[serde(default)]
    pub failed: bool,

    /// Unix millis when the event reached its terminal state
    #[serde(rename = "processedAt", default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<i64>,

    /// Consumer-reported result, recorded on complete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Most recent failure message, kept for operator inspection
    #[serde(rename = "lastError", default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl QueuedEvent {
    /// Whether some worker holds a claim that has not yet expired
    pub fn has_live_claim_at(&self, now_ms: i64) -> bool {
        matches!(self.locked_until, Some(until) if until > now_ms)
    }

    /// Whether a worker may claim this event as of `now_ms`
    pub fn is_claimable_at(&self, now_ms: i64) -> bool {
        !self.processed && self.available_at <= now_ms && !self.has_live_claim_at(now_ms)
    }
}

/// Options for publishing an event
#[derive(Debug, Clone, Deserialize)]
pub struct PublishOptions {
    /// Higher-priority events are claimed first (default 0)
    #[serde(default)]
    pub priority: i32,

    /// Delay before the event becomes claimable (default: immediately)
    #[serde(rename = "delayMs", default)]
    pub delay_ms: i64,

    /// Failures allowed before dead-lettering (default 3)
    #[serde(rename = "maxRetries", default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    3
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            priority: 0,
            delay_ms: 0,
            max_retries: default_max_retries(),
        }
    }
}

/// Outcome of a `fail` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailOutcome {
    /// Retry scheduled; the event becomes claimable again at this instant
    Retried { next_available_at: i64 },
    /// Retry budget exhausted; event parked for manual inspection
    DeadLettered,
    /// The caller no longer holds the claim; nothing was changed
    Ignored,
}

/// Queue counters for observability
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueStats {
    /// Unclaimed and awaiting (or scheduled for) delivery
    pub pending: usize,
    /// Currently held by a worker under a live claim
    pub processing: usize,
    /// Terminal: completed successfully
    pub completed: usize,
    /// Terminal: dead-lettered after exhausting retries
    pub failed: usize,
    /// All events currently retained in the store
    pub total: usize,
}
