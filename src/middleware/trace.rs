//! `TraceLayer` span maker that keeps credentials and personal data out of logs.
//!
//! OAuth callbacks carry `code` and `state`, and most proxy routes carry the
//! caller's email in the query string. Their values are redacted before the
//! URI is recorded.

use axum::http::{Request, Uri};
use tower_http::trace::MakeSpan;
use tracing::Span;

/// Query parameter names whose values must be redacted in logs.
const SENSITIVE_PARAMS: &[&str] = &[
    "code",
    "state",
    "token",
    "access_token",
    "id_token",
    "client_secret",
    "password",
    "email",
    "user_email",
];

/// A `MakeSpan` implementation that redacts sensitive query parameters from
/// the logged URI.
#[derive(Clone, Debug)]
pub struct SanitizedMakeSpan;

impl<B> MakeSpan<B> for SanitizedMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        tracing::info_span!(
            "http",
            method = %request.method(),
            uri = %sanitize_uri(request.uri()),
            version = ?request.version(),
        )
    }
}

/// Example: `/api/wills?user_email=jane%40example.com&status=draft`
/// becomes `/api/wills?user_email=[REDACTED]&status=draft`
fn sanitize_uri(uri: &Uri) -> String {
    let Some(query) = uri.query() else {
        return uri.path().to_string();
    };

    let pairs: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if is_sensitive(key) => format!("{key}=[REDACTED]"),
            _ => pair.to_string(),
        })
        .collect();

    format!("{}?{}", uri.path(), pairs.join("&"))
}

fn is_sensitive(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_PARAMS.iter().any(|s| key == *s)
}
