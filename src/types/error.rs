//! Error taxonomy for coordination operations
//!
//! Transient conflicts (`VersionConflict`) are retried internally by the
//! updater and only surface as `RetryExhausted`. Structural errors
//! (`NotFound`, `DocumentExists`) propagate immediately and are never retried.

use std::fmt;

/// Result type for coordination operations
pub type CoordResult<T> = Result<T, CoordError>;

/// Errors that can occur in coordination operations
#[derive(Debug)]
pub enum CoordError {
    /// Target document absent; never retried
    NotFound(String),
    /// A document with this id already exists
    DocumentExists(String),
    /// Document payload was not a JSON object
    InvalidPayload(String),
    /// Conditional write named a stale version; carries the version
    /// currently in the store so the caller can re-read and retry
    VersionConflict {
        id: String,
        expected: u64,
        current: u64,
    },
    /// Conflict retries exhausted; the caller must refresh and retry
    RetryExhausted { id: String, attempts: u32 },
    /// Lease not acquired within the configured retries
    LockUnavailable { resource: String, retries: u32 },
    /// Event id not present in the queue
    EventNotFound(u64),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl CoordError {
    /// Machine-readable code for API error envelopes
    pub fn code(&self) -> &'static str {
        match self {
            CoordError::NotFound(_) => "NOT_FOUND",
            CoordError::DocumentExists(_) => "DOCUMENT_EXISTS",
            CoordError::InvalidPayload(_) => "INVALID_PAYLOAD",
            CoordError::VersionConflict { .. } => "VERSION_CONFLICT",
            CoordError::RetryExhausted { .. } => "RETRY_EXHAUSTED",
            CoordError::LockUnavailable { .. } => "LOCK_UNAVAILABLE",
            CoordError::EventNotFound(_) => "EVENT_NOT_FOUND",
            CoordError::Io(_) => "IO_ERROR",
            CoordError::Json(_) => "JSON_ERROR",
        }
    }
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::NotFound(id) => write!(f, "Document '{}' not found", id),
            CoordError::DocumentExists(id) => write!(f, "Document '{}' already exists", id),
            CoordError::InvalidPayload(id) => {
                write!(f, "Payload for '{}' must be a JSON object", id)
            }
            CoordError::VersionConflict {
                id,
                expected,
                current,
            } => write!(
                f,
                "Version conflict on '{}': expected {}, store has {}",
                id, expected, current
            ),
            CoordError::RetryExhausted { id, attempts } => write!(
                f,
                "Update of '{}' still conflicting after {} attempts; refresh and retry",
                id, attempts
            ),
            CoordError::LockUnavailable { resource, retries } => write!(
                f,
                "Lease on '{}' not acquired after {} retries",
                resource, retries
            ),
            CoordError::EventNotFound(id) => write!(f, "Event {} not found", id),
            CoordError::Io(e) => write!(f, "IO error: {}", e),
            CoordError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for CoordError {}

impl From<std::io::Error> for CoordError {
    fn from(e: std::io::Error) -> Self {
        CoordError::Io(e)
    }
}

impl From<serde_json::Error> for CoordError {
    fn from(e: serde_json::Error) -> Self {
        CoordError::Json(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_conflict_display_carries_current_version() {
        let err = CoordError::VersionConflict {
            id: "LOAN-1".to_string(),
            expected: 3,
            current: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("LOAN-1"));
        assert!(msg.contains("expected 3"));
        assert!(msg.contains("store has 5"));
        assert_eq!(err.code(), "VERSION_CONFLICT");
    }

    #[test]
    fn test_retry_exhausted_tells_caller_to_refresh() {
        let err = CoordError::RetryExhausted {
            id: "LOAN-1".to_string(),
            attempts: 4,
        };
        assert!(err.to_string().contains("refresh and retry"));
        assert_eq!(err.code(), "RETRY_EXHAUSTED");
    }
}
