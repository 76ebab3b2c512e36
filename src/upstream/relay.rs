//! Turning upstream responses into gateway responses

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use super::transport_error;
use crate::error::{AppError, Result};

/// Relay a JSON upstream response, preserving its status.
///
/// - success with a JSON body: decoded and re-encoded
/// - success with an empty body: status only
/// - success with anything else: `InvalidUpstreamResponse`
/// - non-success: the upstream JSON body verbatim, or a generic envelope when
///   the body is not JSON
pub async fn relay_json(resp: reqwest::Response) -> Result<Response> {
    let status = resp.status();
    let bytes = resp.bytes().await.map_err(transport_error)?;

    if status.is_success() {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(status.into_response());
        }
        let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::InvalidUpstreamResponse(format!("{} body is not JSON: {}", status, e))
        })?;
        return Ok((status, Json(value)).into_response());
    }

    tracing::info!(status = status.as_u16(), "Relaying upstream error status");
    Ok(error_response(status, &bytes))
}

fn error_response(status: StatusCode, bytes: &[u8]) -> Response {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => (status, Json(value)).into_response(),
        Err(_) => (
            status,
            Json(json!({
                "error": "Upstream request failed",
                "code": "upstream_error"
            })),
        )
            .into_response(),
    }
}

/// Stream a binary upstream response as a download.
///
/// The upstream content type is kept (defaulting to `application/pdf`) and a
/// `Content-Disposition: attachment` header names the file. Non-success
/// statuses are relayed like JSON errors.
pub async fn relay_pdf(resp: reqwest::Response, filename: &str) -> Result<Response> {
    let status = resp.status();
    if !status.is_success() {
        return relay_json(resp).await;
    }

    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/pdf"));

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        sanitize_filename(filename)
    ))
    .map_err(|e| AppError::Internal(e.into()))?;

    let mut response = Response::new(Body::from_stream(resp.bytes_stream()));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    Ok(response)
}

/// Restrict a download name to `[A-Za-z0-9._-]`
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches(|c| c == '.' || c == '_').is_empty() {
        "download.pdf".to_string()
    } else {
        cleaned
    }
}
