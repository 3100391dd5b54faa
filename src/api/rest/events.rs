//! Event queue endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{status_for, ApiError, ApiResponse};
use crate::api::state::AppState;
use crate::types::{FailOutcome, PublishOptions};

/// Body for POST /api/events
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(flatten)]
    pub options: PublishOptions,
}

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    #[serde(rename = "eventId")]
    pub event_id: u64,
}

fn default_lock_duration_ms() -> i64 {
    30_000
}

/// Body for POST /api/events/claim
#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    /// Restrict to one event type; omit to claim any
    #[serde(rename = "eventType")]
    pub event_type: Option<String>,
    #[serde(rename = "workerId")]
    pub worker_id: String,
    #[serde(rename = "lockDurationMs", default = "default_lock_duration_ms")]
    pub lock_duration_ms: i64,
}

/// Body for POST /api/events/:id/complete
#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    #[serde(rename = "workerId")]
    pub worker_id: String,
    pub result: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    /// False when the caller's claim had lapsed: a harmless no-op
    pub completed: bool,
}

/// Body for POST /api/events/:id/fail
#[derive(Debug, Deserialize)]
pub struct FailRequest {
    #[serde(rename = "workerId")]
    pub worker_id: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct FailResponse {
    /// "retried", "dead_lettered" or "ignored"
    pub outcome: &'static str,
    #[serde(rename = "nextAvailableAt", skip_serializing_if = "Option::is_none")]
    pub next_available_at: Option<i64>,
}

/// Body for POST /api/events/cleanup
#[derive(Debug, Deserialize)]
pub struct CleanupRequest {
    #[serde(rename = "olderThanDays")]
    pub older_than_days: i64,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub removed: usize,
}

/// POST /api/events - Publish an event
pub async fn publish_event(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PublishRequest>,
) -> impl IntoResponse {
    if req.event_type.trim().is_empty() {
        let error = ApiError::bad_request("Event type must not be empty");
        return (StatusCode::BAD_REQUEST, Json(error)).into_response();
    }

    match state.queue.publish(&req.event_type, req.payload, req.options) {
        Ok(event_id) => (
            StatusCode::CREATED,
            Json(ApiResponse::new(PublishResponse { event_id })),
        )
            .into_response(),
        Err(e) => (status_for(&e), Json(ApiError::from_coord(&e))).into_response(),
    }
}

/// POST /api/events/claim - Claim at most one event
///
/// 200 with the claimed event, or 204 when nothing is claimable (a normal
/// empty result, not an error).
pub async fn claim_event(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClaimRequest>,
) -> impl IntoResponse {
    match state.queue.claim(
        req.event_type.as_deref(),
        &req.worker_id,
        req.lock_duration_ms,
    ) {
        Ok(Some(event)) => (StatusCode::OK, Json(ApiResponse::new(event))).into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => (status_for(&e), Json(ApiError::from_coord(&e))).into_response(),
    }
}

/// GET /api/events/:id - Inspect one event (e.g. a dead letter's lastError)
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    match state.queue.get(id) {
        Ok(event) => (StatusCode::OK, Json(ApiResponse::new(event))).into_response(),
        Err(e) => (status_for(&e), Json(ApiError::from_coord(&e))).into_response(),
    }
}

/// POST /api/events/:id/complete - Mark processed
pub async fn complete_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(req): Json<CompleteRequest>,
) -> impl IntoResponse {
    match state.queue.complete(id, &req.worker_id, req.result) {
        Ok(completed) => (
            StatusCode::OK,
            Json(ApiResponse::new(CompleteResponse { completed })),
        )
            .into_response(),
        Err(e) => (status_for(&e), Json(ApiError::from_coord(&e))).into_response(),
    }
}

/// POST /api/events/:id/fail - Record a failure
pub async fn fail_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(req): Json<FailRequest>,
) -> impl IntoResponse {
    match state.queue.fail(id, &req.worker_id, &req.error) {
        Ok(outcome) => {
            let response = match outcome {
                FailOutcome::Retried { next_available_at } => FailResponse {
                    outcome: "retried",
                    next_available_at: Some(next_available_at),
                },
                FailOutcome::DeadLettered => FailResponse {
                    outcome: "dead_lettered",
                    next_available_at: None,
                },
                FailOutcome::Ignored => FailResponse {
                    outcome: "ignored",
                    next_available_at: None,
                },
            };
            (StatusCode::OK, Json(ApiResponse::new(response))).into_response()
        }
        Err(e) => (status_for(&e), Json(ApiError::from_coord(&e))).into_response(),
    }
}

/// GET /api/events/stats - Queue counters
pub async fn event_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::new(state.queue.stats()))
}

/// POST /api/events/cleanup - Retention cleanup for processed events
pub async fn cleanup_events(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CleanupRequest>,
) -> impl IntoResponse {
    match state.queue.cleanup(req.older_than_days) {
        Ok(removed) => (
            StatusCode::OK,
            Json(ApiResponse::new(CleanupResponse { removed })),
        )
            .into_response(),
        Err(e) => (status_for(&e), Json(ApiError::from_coord(&e))).into_response(),
    }
}
