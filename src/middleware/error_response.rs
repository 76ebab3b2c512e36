//! Error response normalization middleware
//!
//! Framework-level rejections (unknown route, wrong method, unreadable body)
//! come back as `text/plain`. This rewrites them into the same
//! `{ "error", "code" }` envelope the handlers use, so callers never see
//! parser internals.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Normalize non-JSON error responses.
///
/// JSON errors from [`AppError`](crate::error::AppError) and relayed upstream
/// bodies pass through untouched, as do rendered HTML pages.
pub async fn normalize_error_response(request: Request<Body>, next: Next) -> Response {
    let response = next.run(request).await;

    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.contains("application/json") || content_type.starts_with("text/html") {
        return response;
    }

    generic_error_response(status)
}

fn generic_error_response(status: StatusCode) -> Response {
    let (code, message) = match status {
        StatusCode::BAD_REQUEST => ("bad_request", "Invalid request body"),
        StatusCode::UNAUTHORIZED => ("unauthorized", "Authentication required"),
        StatusCode::FORBIDDEN => ("forbidden", "Access denied"),
        StatusCode::NOT_FOUND => ("not_found", "Not found"),
        StatusCode::METHOD_NOT_ALLOWED => ("method_not_allowed", "Method not allowed"),
        StatusCode::PAYLOAD_TOO_LARGE => ("payload_too_large", "Request body too large"),
        StatusCode::UNPROCESSABLE_ENTITY => ("validation_error", "Validation error"),
        StatusCode::UNSUPPORTED_MEDIA_TYPE => {
            ("unsupported_media_type", "Unsupported content type")
        }
        _ if status.is_client_error() => ("client_error", "Client error"),
        _ => ("internal_error", "An internal error occurred"),
    };

    (status, axum::Json(json!({ "error": message, "code": code }))).into_response()
}
