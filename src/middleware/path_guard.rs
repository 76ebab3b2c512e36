//! Path traversal guard
//!
//! Path parameters are spliced into upstream URLs, so a request whose path
//! contains dot segments, raw or percent-encoded, is rejected before routing.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};

/// Returns `true` if any path segment decodes to `.` or `..`, or smuggles a
/// separator through percent-encoding.
fn is_suspicious(path: &str) -> bool {
    path.split('/').any(|seg| {
        let lower = seg.to_ascii_lowercase();
        if lower.contains("%2f") || lower.contains("%5c") {
            return true;
        }
        let decoded = lower.replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}

/// Reject requests with traversal sequences in the URI path
pub async fn path_guard_middleware(
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    if is_suspicious(request.uri().path()) {
        tracing::warn!(path = %request.uri().path(), "Rejected path with dot segments");
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(next.run(request).await)
}
