//! Lease endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use super::{status_for, ApiError, ApiResponse};
use crate::api::state::AppState;

fn default_ttl_ms() -> i64 {
    30_000
}

/// Body for POST /api/leases/:key/acquire
#[derive(Debug, Deserialize)]
pub struct AcquireRequest {
    #[serde(rename = "ttlMs", default = "default_ttl_ms")]
    pub ttl_ms: i64,
    /// Reuse a caller-chosen token (e.g. for re-acquire after a crash);
    /// generated server-side when omitted
    #[serde(rename = "ownerToken")]
    pub owner_token: Option<String>,
}

/// Body for POST /api/leases/:key/release
#[derive(Debug, Deserialize)]
pub struct ReleaseRequest {
    #[serde(rename = "ownerToken")]
    pub owner_token: String,
}

#[derive(Debug, Serialize)]
pub struct ReleaseResponse {
    pub released: bool,
}

/// Body for POST /api/leases/:key/extend
#[derive(Debug, Deserialize)]
pub struct ExtendRequest {
    #[serde(rename = "ownerToken")]
    pub owner_token: String,
    #[serde(rename = "additionalTtlMs", default = "default_ttl_ms")]
    pub additional_ttl_ms: i64,
}

#[derive(Debug, Serialize)]
pub struct ExtendResponse {
    pub extended: bool,
    #[serde(rename = "expiresAt", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

fn decode_key(key: &str) -> String {
    // Lease keys may contain spaces and slashes
    urlencoding::decode(key)
        .unwrap_or_else(|_| key.to_string().into())
        .into_owned()
}

/// POST /api/leases/:key/acquire - Try to take the lease
///
/// Always 200: `acquired` in the body says whether this caller won. Racing
/// callers are serialized by the store, so exactly one sees `acquired: true`.
pub async fn acquire_lease(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(req): Json<AcquireRequest>,
) -> impl IntoResponse {
    let key = decode_key(&key);
    match state.leases.acquire(&key, req.ttl_ms, req.owner_token) {
        Ok(grant) => (StatusCode::OK, Json(ApiResponse::new(grant))).into_response(),
        Err(e) => (status_for(&e), Json(ApiError::from_coord(&e))).into_response(),
    }
}

/// POST /api/leases/:key/release - Release if still the owner
pub async fn release_lease(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(req): Json<ReleaseRequest>,
) -> impl IntoResponse {
    let key = decode_key(&key);
    match state.leases.release(&key, &req.owner_token) {
        Ok(released) => (
            StatusCode::OK,
            Json(ApiResponse::new(ReleaseResponse { released })),
        )
            .into_response(),
        Err(e) => (status_for(&e), Json(ApiError::from_coord(&e))).into_response(),
    }
}

/// POST /api/leases/:key/extend - Heartbeat for long critical sections
pub async fn extend_lease(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(req): Json<ExtendRequest>,
) -> impl IntoResponse {
    let key = decode_key(&key);
    match state
        .leases
        .extend(&key, &req.owner_token, req.additional_ttl_ms)
    {
        Ok(expires_at) => (
            StatusCode::OK,
            Json(ApiResponse::new(ExtendResponse {
                extended: expires_at.is_some(),
                expires_at,
            })),
        )
            .into_response(),
        Err(e) => (status_for(&e), Json(ApiError::from_coord(&e))).into_response(),
    }
}
