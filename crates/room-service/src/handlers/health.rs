//! Health check handler.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

/// Handler for GET /health.
///
/// Returns 200 when the store answers a ping and 503 otherwise. The store
/// error itself is logged, not returned.
#[tracing::instrument(skip_all, name = "room.health")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let store = state.store.backend().to_string();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                store,
            }),
        ),
        Err(e) => {
            tracing::warn!(target: "room.health", error = %e, "Health check failed: store unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy".to_string(),
                    store,
                }),
            )
        }
    }
}
