//! Session authentication extractors
//!
//! Provides:
//! - `Principal` extractor for handlers requiring a signed-in user
//! - `OptionalPrincipal` for handlers whose access policy decides later
//! - credential lookup shared with the session gate

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::session::{SessionClaims, SessionManager};
use crate::state::HasSessions;

/// The signed-in user, as vouched for by the session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Identity provider subject
    pub subject: String,
    /// Stable email address; the identifying parameter for user-scoped data
    pub email: String,
    pub name: Option<String>,
    /// Session expiry (Unix timestamp)
    pub expires_at: i64,
}

impl Principal {
    pub fn from_claims(claims: SessionClaims) -> Self {
        Self {
            subject: claims.sub,
            email: claims.email,
            name: claims.name,
            expires_at: claims.exp,
        }
    }

    /// Whether `email` names this principal (case-insensitive, ignoring
    /// surrounding whitespace)
    pub fn owns(&self, email: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(email.trim())
    }
}

/// Authentication errors
#[derive(Debug, Clone)]
pub enum AuthError {
    /// No session cookie or bearer token present
    MissingSession,
    /// Credential present but invalid or expired
    InvalidSession,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingSession => "Unauthorized - please sign in",
            AuthError::InvalidSession => "Invalid or expired session",
        };

        let body = serde_json::json!({
            "error": message,
            "code": "unauthorized"
        });

        (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
    }
}

/// Every session credential the request carries, in the order they are
/// tried: the session cookie, then a `Bearer` Authorization header.
pub fn session_token_candidates(headers: &HeaderMap, cookie_name: &str) -> Vec<String> {
    let from_cookie = CookieJar::from_headers(headers)
        .get(cookie_name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());

    let from_bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    from_cookie.into_iter().chain(from_bearer).collect()
}

/// First candidate that verifies; a stale cookie does not shadow a valid
/// bearer token.
fn verify_first(tokens: &[String], sessions: &SessionManager) -> Option<Principal> {
    tokens.iter().find_map(|token| match sessions.verify_session_token(token) {
        Ok(claims) => Some(Principal::from_claims(claims)),
        Err(e) => {
            tracing::debug!(error = %e, "Rejected session credential");
            None
        }
    })
}

/// Resolve a principal from request headers.
///
/// Invalid and expired credentials are indistinguishable from absent ones.
pub fn resolve_principal(headers: &HeaderMap, sessions: &SessionManager) -> Option<Principal> {
    verify_first(
        &session_token_candidates(headers, sessions.cookie_name()),
        sessions,
    )
}

impl<S> FromRequestParts<S> for Principal
where
    S: HasSessions,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already resolved by the session gate
        if let Some(principal) = parts.extensions.get::<Principal>() {
            return Ok(principal.clone());
        }

        let tokens = session_token_candidates(&parts.headers, state.sessions().cookie_name());
        if tokens.is_empty() {
            return Err(AuthError::MissingSession);
        }

        verify_first(&tokens, state.sessions()).ok_or(AuthError::InvalidSession)
    }
}

/// Optional authentication extractor
///
/// Returns `Some(Principal)` if a valid session is present, `None` otherwise.
#[derive(Debug, Clone)]
pub struct OptionalPrincipal(pub Option<Principal>);

impl<S> FromRequestParts<S> for OptionalPrincipal
where
    S: HasSessions,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Principal::from_request_parts(parts, state).await {
            Ok(principal) => Ok(OptionalPrincipal(Some(principal))),
            Err(_) => Ok(OptionalPrincipal(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use axum::http::header::COOKIE;

    fn test_sessions() -> SessionManager {
        SessionManager::new(SessionConfig {
            secret: "test-secret-key-for-session-signing".to_string(),
            issuer: "http://gateway.test".to_string(),
            ttl_secs: 3600,
            cookie_name: "estate_session".to_string(),
            cookie_secure: false,
        })
    }

    fn principal(email: &str) -> Principal {
        Principal {
            subject: "sub-1".to_string(),
            email: email.to_string(),
            name: None,
            expires_at: 0,
        }
    }

    #[test]
    fn test_owns_is_case_insensitive() {
        let p = principal("Jane@Example.com");
        assert!(p.owns("jane@example.com"));
        assert!(p.owns("  JANE@EXAMPLE.COM "));
        assert!(!p.owns("john@example.com"));
        assert!(!p.owns(""));
    }

    #[test]
    fn test_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "theme=dark; estate_session=abc.def.ghi".parse().unwrap());
        assert_eq!(
            session_token_candidates(&headers, "estate_session"),
            vec!["abc.def.ghi"]
        );
    }

    #[test]
    fn test_token_from_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer test-token-123".parse().unwrap());
        assert_eq!(
            session_token_candidates(&headers, "estate_session"),
            vec!["test-token-123"]
        );
    }

    #[test]
    fn test_cookie_tried_before_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "estate_session=from-cookie".parse().unwrap());
        headers.insert(AUTHORIZATION, "Bearer from-header".parse().unwrap());
        assert_eq!(
            session_token_candidates(&headers, "estate_session"),
            vec!["from-cookie", "from-header"]
        );
    }

    #[test]
    fn test_token_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
        assert!(session_token_candidates(&headers, "estate_session").is_empty());
    }

    #[test]
    fn test_stale_cookie_falls_back_to_valid_bearer() {
        let sessions = test_sessions();
        let token = sessions
            .create_session_token("sub-9", "jane@example.com", None)
            .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "estate_session=expired-or-forged".parse().unwrap());
        headers.insert(AUTHORIZATION, format!("Bearer {}", token).parse().unwrap());

        let resolved = resolve_principal(&headers, &sessions).unwrap();
        assert_eq!(resolved.email, "jane@example.com");
    }

    #[test]
    fn test_resolve_principal_valid_and_invalid() {
        let sessions = test_sessions();
        let token = sessions
            .create_session_token("sub-9", "jane@example.com", Some("Jane"))
            .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, format!("estate_session={}", token).parse().unwrap());
        let resolved = resolve_principal(&headers, &sessions).unwrap();
        assert_eq!(resolved.email, "jane@example.com");
        assert_eq!(resolved.subject, "sub-9");

        let mut bad = HeaderMap::new();
        bad.insert(COOKIE, "estate_session=not-a-jwt".parse().unwrap());
        assert!(resolve_principal(&bad, &sessions).is_none());
    }

    #[test]
    fn test_auth_error_into_response() {
        for error in [AuthError::MissingSession, AuthError::InvalidSession] {
            assert_eq!(error.into_response().status(), StatusCode::UNAUTHORIZED);
        }
    }
}
