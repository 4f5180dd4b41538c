//! Metrics definitions for the auth service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `auth_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `token_type`: access, refresh
//! - `status`: success, error
//! - `error_category`: malformed, cryptographic, expired, claims, key,
//!   stale, forbidden, internal
//! - `result`: hit, miss
//! - `method`: HTTP methods served by the router
//! - `status_code`: HTTP status codes

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used by the
/// `/metrics` endpoint.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("auth_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Key fetches are bounded by the transport deadline (10s default)
        .set_buckets_for_metric(
            Matcher::Prefix("auth_key_fetch".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set key fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Key Resolver Metrics
// ============================================================================

/// Record a key cache lookup, once per resolve. `miss` means the lookup
/// went on to fetch the key set.
///
/// Metric: `auth_key_cache_lookups_total`
/// Labels: `result`
pub fn record_key_cache_lookup(result: &str) {
    counter!("auth_key_cache_lookups_total", "result" => result.to_string()).increment(1);
}

/// Record a fetch of the identity provider's key set.
///
/// Metric: `auth_key_fetch_total`, `auth_key_fetch_duration_seconds`
/// Labels: `status`
pub fn record_key_fetch(status: &str, duration: Duration) {
    histogram!("auth_key_fetch_duration_seconds", "status" => status.to_string())
        .record(duration.as_secs_f64());

    counter!("auth_key_fetch_total", "status" => status.to_string()).increment(1);
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record an identity token verification.
///
/// Metric: `auth_identity_verifications_total`
/// Labels: `status`, `error_category`
pub fn record_identity_verification(status: &str, error_category: Option<&str>) {
    let category = error_category.unwrap_or("none");
    counter!("auth_identity_verifications_total",
        "status" => status.to_string(),
        "error_category" => category.to_string()
    )
    .increment(1);
}

/// Record a session token issuance.
///
/// Metric: `auth_token_issuance_total`
/// Labels: `token_type`
pub fn record_token_issuance(token_type: &str) {
    counter!("auth_token_issuance_total", "token_type" => token_type.to_string()).increment(1);
}

/// Record a session token validation.
///
/// Metric: `auth_token_validations_total`
/// Labels: `token_type`, `status`, `error_category`
pub fn record_token_validation(token_type: &str, status: &str, error_category: Option<&str>) {
    let category = error_category.unwrap_or("none");
    counter!("auth_token_validations_total",
        "token_type" => token_type.to_string(),
        "status" => status.to_string(),
        "error_category" => category.to_string()
    )
    .increment(1);
}

// ============================================================================
// Session Metrics
// ============================================================================

/// Record a login attempt.
///
/// Metric: `auth_logins_total`
/// Labels: `status`
pub fn record_login(status: &str) {
    counter!("auth_logins_total", "status" => status.to_string()).increment(1);
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `auth_http_requests_total`, `auth_http_request_duration_seconds`
/// Labels: `method`, `status_code`
///
/// Paths are not a label; protected routes embed user ids.
pub fn record_http_request(method: &str, status_code: u16, duration: Duration) {
    histogram!("auth_http_request_duration_seconds",
        "method" => method.to_string(),
        "status" => categorize_status_code(status_code).to_string()
    )
    .record(duration.as_secs_f64());

    counter!("auth_http_requests_total",
        "method" => method.to_string(),
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}
