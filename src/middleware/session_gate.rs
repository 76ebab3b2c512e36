//! Session gate middleware
//!
//! Runs before routing. Requests whose path falls under a protected prefix
//! must carry a valid session; anything else is redirected to the login page
//! with the original location preserved in `callbackUrl`. The gate only reads
//! the session and never re-issues or clears cookies.

use axum::{
    body::Body,
    extract::State,
    http::{header::LOCATION, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::auth::resolve_principal;
use crate::config::SessionGateConfig;
use crate::session::SessionManager;

/// Shared state for the session gate
#[derive(Clone)]
pub struct SessionGateState {
    sessions: SessionManager,
    prefixes: Arc<Vec<String>>,
    login_path: Arc<str>,
}

impl SessionGateState {
    pub fn new(sessions: SessionManager, config: &SessionGateConfig) -> Self {
        let prefixes = config
            .protected_paths
            .iter()
            .filter_map(|p| normalize_pattern(p))
            .collect();

        Self {
            sessions,
            prefixes: Arc::new(prefixes),
            login_path: Arc::from(config.login_path.as_str()),
        }
    }

    /// Whether `path` requires a session
    pub fn is_protected(&self, path: &str) -> bool {
        if path == &*self.login_path {
            return false;
        }
        self.prefixes
            .iter()
            .any(|prefix| prefix == "/" || matches_prefix(path, prefix))
    }

    fn login_redirect(&self, callback: &str) -> Response {
        let location = format!(
            "{}?callbackUrl={}",
            self.login_path,
            urlencoding::encode(callback)
        );
        (StatusCode::TEMPORARY_REDIRECT, [(LOCATION, location)]).into_response()
    }
}

/// Reduce a matcher pattern to its static prefix.
///
/// `/dashboard/:path*` and `/dashboard/*` both become `/dashboard`; trailing
/// slashes are dropped. Returns `None` for blank patterns.
pub fn normalize_pattern(pattern: &str) -> Option<String> {
    let trimmed = pattern.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut segments = Vec::new();
    for segment in trimmed.split('/').filter(|s| !s.is_empty()) {
        if segment.starts_with(':') || segment.starts_with('*') || segment.starts_with('{') {
            break;
        }
        segments.push(segment);
    }

    Some(format!("/{}", segments.join("/")))
}

/// Segment-aware prefix match: `/dashboard` matches `/dashboard` and
/// `/dashboard/wills` but not `/dashboardx`.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Session gate middleware
///
/// Protected path with a valid session: the resolved [`Principal`] is added to
/// the request extensions and the request continues unchanged. Missing,
/// invalid or expired session: `307` to the login path.
///
/// [`Principal`]: super::auth::Principal
pub async fn session_gate_middleware(
    State(gate): State<SessionGateState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if !gate.is_protected(path) {
        return next.run(request).await;
    }

    match resolve_principal(request.headers(), &gate.sessions) {
        Some(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        None => {
            let callback = request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| path.to_string());
            tracing::debug!(path = %request.uri().path(), "Redirecting unauthenticated request to login");
            gate.login_redirect(&callback)
        }
    }
}
