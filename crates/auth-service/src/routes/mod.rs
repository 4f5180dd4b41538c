//! HTTP routes for the auth service.
//!
//! Defines the Axum router and application state.

use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_session};
use crate::repositories::SessionStore;
use crate::services::SessionService;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session orchestration (login, refresh, authorize, logout).
    pub sessions: Arc<SessionService>,

    /// Session store, used directly by the health check.
    pub store: Arc<dyn SessionStore>,
}

/// Build the application routes.
///
/// - `/health` - store ping, public
/// - `/metrics` - Prometheus text, public
/// - `/api/v1/login` - identity token for session tokens, public
/// - `/api/v1/token` - refresh token for new session tokens, public
/// - `/api/v1/user/:user_id[/logout]` - session management, requires session
/// - TraceLayer, 30 second timeout, HTTP metrics (outermost)
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/v1/login", post(handlers::login))
        .route("/api/v1/token", post(handlers::refresh_token))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let protected_routes = Router::new()
        .route(
            "/api/v1/user/:user_id",
            get(handlers::get_user).delete(handlers::delete_user),
        )
        .route("/api/v1/user/:user_id/logout", put(handlers::logout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer (innermost)
    // 2. TraceLayer
    // 3. http_metrics_middleware (outermost, sees every response)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
