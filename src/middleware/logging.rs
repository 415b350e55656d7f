//! Logging middleware

use axum::{body::Body, extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn};

/// Request logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);

    let response = next.run(request).await;

    let status = response.status();
    let duration_ms = format!("{:.2}", start.elapsed().as_secs_f64() * 1000.0);
    let query = query.unwrap_or_default();

    if status.is_server_error() {
        warn!(
            method = %method,
            path = %path,
            query = %query,
            status = status.as_u16(),
            duration_ms = %duration_ms,
            "Request failed"
        );
    } else if status.is_client_error() {
        info!(
            method = %method,
            path = %path,
            query = %query,
            status = status.as_u16(),
            duration_ms = %duration_ms,
            "Request rejected"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = %duration_ms,
            "Request completed"
        );
    }

    response
}
