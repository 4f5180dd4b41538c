//! HTTP metrics middleware.
//!
//! Applied as the outermost layer so framework-level rejections (404,
//! 405, 415, timeouts) are counted alongside handler responses.

use crate::observability::metrics::record_http_request;
use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Records method, status code and duration of every request.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let response = next.run(request).await;

    record_http_request(&method, response.status().as_u16(), start.elapsed());
    response
}
