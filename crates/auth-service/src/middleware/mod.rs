//! HTTP middleware for the auth service.
//!
//! - `auth` - session authorization for protected routes
//! - `http_metrics` - request metrics for every response

pub mod auth;
pub mod http_metrics;

pub use auth::{bearer_token, require_session};
pub use http_metrics::http_metrics_middleware;
