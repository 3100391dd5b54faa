//! REST API module for HTTP endpoints
//!
//! Provides the three coordination function families over HTTP:
//! - `/api/documents/*` - versioned reads and conditional writes
//! - `/api/leases/*` - acquire/release/extend
//! - `/api/events/*` - publish/claim/complete/fail/stats/cleanup

pub mod documents;
pub mod events;
pub mod leases;

use serde::Serialize;

use crate::types::CoordError;

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// API error response
///
/// `code` is machine-readable so callers can branch on it; a version conflict
/// additionally carries the current version so the caller can re-read,
/// re-apply and retry.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
    #[serde(rename = "currentVersion", skip_serializing_if = "Option::is_none")]
    pub current_version: Option<u64>,
}

impl ApiError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            current_version: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message, "NOT_FOUND")
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message, "BAD_REQUEST")
    }

    /// Map a toolkit error onto the wire shape
    pub fn from_coord(err: &CoordError) -> Self {
        let mut api = Self::new(err.to_string(), err.code());
        if let CoordError::VersionConflict { current, .. } = err {
            api.current_version = Some(*current);
        }
        api
    }
}

/// HTTP status for a toolkit error
pub fn status_for(err: &CoordError) -> axum::http::StatusCode {
    use axum::http::StatusCode;
    match err {
        CoordError::NotFound(_) | CoordError::EventNotFound(_) => StatusCode::NOT_FOUND,
        CoordError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
        CoordError::DocumentExists(_)
        | CoordError::VersionConflict { .. }
        | CoordError::RetryExhausted { .. }
        | CoordError::LockUnavailable { .. } => StatusCode::CONFLICT,
        CoordError::Io(_) | CoordError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_conflict_envelope_carries_current_version() {
        let err = CoordError::VersionConflict {
            id: "LOAN-1".to_string(),
            expected: 1,
            current: 2,
        };
        let api = ApiError::from_coord(&err);
        assert_eq!(api.code, "VERSION_CONFLICT");
        assert_eq!(api.current_version, Some(2));

        let json = serde_json::to_string(&api).unwrap();
        assert!(json.contains("\"currentVersion\":2"));
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let err = CoordError::NotFound("x".to_string());
        assert_eq!(status_for(&err), axum::http::StatusCode::NOT_FOUND);
        let api = ApiError::from_coord(&err);
        assert!(api.current_version.is_none());
    }
}
