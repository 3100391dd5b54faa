//! Document endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use super::{status_for, ApiError, ApiResponse};
use crate::api::state::AppState;
use crate::types::Patch;

/// Body for POST /api/documents
#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub id: String,
    #[serde(default)]
    pub payload: Value,
    /// Defaults to the server's current user when omitted
    #[serde(rename = "updatedBy")]
    pub updated_by: Option<String>,
}

/// Body for POST /api/documents/:id/update
#[derive(Debug, Deserialize)]
pub struct UpdateDocumentRequest {
    /// The version the caller read; the write fails if it is stale
    #[serde(rename = "expectedVersion")]
    pub expected_version: u64,
    pub patch: Patch,
    #[serde(rename = "updatedBy")]
    pub updated_by: Option<String>,
}

/// GET /api/documents/:id - Point read
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let decoded_id = urlencoding::decode(&id)
        .unwrap_or_else(|_| id.clone().into())
        .into_owned();

    match state.store.read_document(&decoded_id) {
        Ok(doc) => (StatusCode::OK, Json(ApiResponse::new(doc))).into_response(),
        Err(e) => (status_for(&e), Json(ApiError::from_coord(&e))).into_response(),
    }
}

/// POST /api/documents - Create at version 1
pub async fn create_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDocumentRequest>,
) -> impl IntoResponse {
    if req.id.trim().is_empty() {
        let error = ApiError::bad_request("Document id must not be empty");
        return (StatusCode::BAD_REQUEST, Json(error)).into_response();
    }

    match state
        .store
        .create_document(&req.id, req.payload, req.updated_by.as_deref())
    {
        Ok(doc) => (StatusCode::CREATED, Json(ApiResponse::new(doc))).into_response(),
        Err(e) => (status_for(&e), Json(ApiError::from_coord(&e))).into_response(),
    }
}

/// POST /api/documents/:id/update - Conditional (compare-and-swap) write
///
/// A 409 response carries the current version so the caller can re-read and
/// retry; the retry loop itself lives client-side, where the transform runs.
pub async fn update_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateDocumentRequest>,
) -> impl IntoResponse {
    let decoded_id = urlencoding::decode(&id)
        .unwrap_or_else(|_| id.clone().into())
        .into_owned();

    match state.store.conditional_update(
        &decoded_id,
        req.expected_version,
        &req.patch,
        req.updated_by.as_deref(),
    ) {
        Ok(doc) => (StatusCode::OK, Json(ApiResponse::new(doc))).into_response(),
        Err(e) => (status_for(&e), Json(ApiError::from_coord(&e))).into_response(),
    }
}
