//! HTTP server setup with Axum

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use super::rest::{documents, events, leases};
use super::state::AppState;
use crate::store::StoreCounts;

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration - allow all origins for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Documents
        .route("/api/documents", post(documents::create_document))
        .route("/api/documents/:id", get(documents::get_document))
        .route("/api/documents/:id/update", post(documents::update_document))
        // Leases
        .route("/api/leases/:key/acquire", post(leases::acquire_lease))
        .route("/api/leases/:key/release", post(leases::release_lease))
        .route("/api/leases/:key/extend", post(leases::extend_lease))
        // Event queue
        .route("/api/events", post(events::publish_event))
        .route("/api/events/claim", post(events::claim_event))
        .route("/api/events/:id", get(events::get_event))
        .route("/api/events/:id/complete", post(events::complete_event))
        .route("/api/events/:id/fail", post(events::fail_event))
        .route("/api/events/stats", get(events::event_stats))
        .route("/api/events/cleanup", post(events::cleanup_events))
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    #[serde(flatten)]
    counts: StoreCounts,
}

/// Health check endpoint with store counts
async fn health_check(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        counts: state.store.counts(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SharedStore;
    use axum::body::Body;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    fn test_state() -> (Arc<AppState>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store =
            Arc::new(SharedStore::with_state_path(temp_dir.path().join("coord.jsonl")).unwrap());
        (Arc::new(AppState::new(store)), temp_dir)
    }

    #[tokio::test]
    async fn test_health_check() {
        let (state, _tmp) = test_state();
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (state, _tmp) = test_state();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 404);
    }
}
