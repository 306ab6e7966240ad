//! API middleware.

use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, Response};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::Json;
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::error::{ErrorResponse, INTERNAL_ERROR_DETAIL};
use crate::state::AppState;

/// Request ID middleware.
///
/// Reuses an incoming `X-Request-ID`, otherwise generates one, and echoes it
/// on the response. Everything logged while handling the request is inside a
/// span carrying the id.
pub async fn request_id(request: Request<Body>, next: Next) -> Response<Body> {
    let request_id = request
        .headers()
        .get("X-Request-ID")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = tracing::info_span!("request", request_id = %request_id);
    let mut response = next.run(request).instrument(span).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-ID", header_value);
    }

    response
}

/// Request logging middleware.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let duration = start.elapsed();

    // Skip probe logging
    if !matches!(uri.path(), "/health" | "/ready" | "/metrics") {
        info!(
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    }

    response
}

/// Replace 5xx error details with a generic message in production.
///
/// The full error has already been logged by the pipeline.
pub async fn hide_internal_errors(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let response = next.run(request).await;
    if !(state.config.is_production() && response.status().is_server_error()) {
        return response;
    }

    let body = Json(ErrorResponse {
        detail: INTERNAL_ERROR_DETAIL.to_string(),
    });
    (response.status(), body).into_response()
}
