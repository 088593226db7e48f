//! HTTP API for the federation plane

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::storage::Presence;
use handlers::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Readiness check response
#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub cluster_name: String,
    pub trusted_cluster_count: usize,
    pub remote_cluster_count: usize,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".into(), version: env!("CARGO_PKG_VERSION").into() })
}

/// GET /ready
pub async fn ready(State(state): State<Arc<AppState>>) -> Json<ReadyResponse> {
    let trusted = state
        .service
        .presence()
        .get_trusted_clusters()
        .await
        .map(|clusters| clusters.len())
        .unwrap_or(0);
    let remote = state
        .service
        .presence()
        .get_remote_clusters()
        .await
        .map(|clusters| clusters.len())
        .unwrap_or(0);

    Json(ReadyResponse {
        ready: true,
        cluster_name: state.service.cluster_name().to_string(),
        trusted_cluster_count: trusted,
        remote_cluster_count: remote,
    })
}

/// Create the API router. The validation endpoint is mounted under the
/// configured API version prefix.
pub fn create_router(state: Arc<AppState>, api_version: &str) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route(
            &format!("/{api_version}/webapi/trustedclusters/validate"),
            post(handlers::validate_trusted_cluster),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
