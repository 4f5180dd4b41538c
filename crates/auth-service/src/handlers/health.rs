//! Health check handler.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

/// GET /health
///
/// Returns 200 when the session store answers, 503 otherwise. Store
/// errors are logged, not returned.
#[tracing::instrument(skip_all, name = "auth.health")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                database: "healthy",
            }),
        ),
        Err(e) => {
            tracing::warn!(target: "auth.http", error = %e, "Health check failed: session store error");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy",
                    database: "unhealthy",
                }),
            )
        }
    }
}
