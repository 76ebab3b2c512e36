//! Sign-in endpoints
//!
//! The authorization code round trip is stateless on the server: the OAuth
//! `state` parameter is a signed token holding a nonce and the post-login
//! destination, and the nonce is also pinned to the initiating browser in a
//! short-lived cookie.

use axum::{
    extract::{Query, State},
    http::{
        header::{CACHE_CONTROL, LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{TimeZone, Utc};
use metrics::counter;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::middleware::OptionalPrincipal;
use crate::session::STATE_TOKEN_TTL_SECS;
use crate::state::AppState;

/// Cookie pinning the OAuth nonce to the browser that started sign-in
pub const STATE_COOKIE: &str = "estate_oauth_state";
const STATE_COOKIE_PATH: &str = "/api/auth";
const DEFAULT_CALLBACK: &str = "/dashboard";

#[derive(Debug, Deserialize)]
pub struct SigninQuery {
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionUser {
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: SessionUser,
    /// RFC 3339 expiry
    pub expires: String,
}

/// Only same-origin absolute paths are accepted as post-login destinations
pub fn safe_callback_path(candidate: Option<&str>) -> String {
    match candidate.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => DEFAULT_CALLBACK.to_string(),
    }
}

fn random_nonce() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Build a `Set-Cookie` value. A non-positive `max_age` expires the cookie.
fn cookie_header(name: &str, value: &str, path: &str, max_age: i64, secure: bool) -> Result<HeaderValue> {
    let builder = Cookie::build((name, value))
        .path(path)
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure);

    let cookie = if max_age > 0 {
        builder.max_age(time::Duration::seconds(max_age)).build()
    } else {
        builder.removal().build()
    };

    HeaderValue::from_str(&cookie.to_string()).map_err(|e| AppError::Internal(e.into()))
}

fn redirect(status: StatusCode, location: &str) -> Result<Response> {
    let location = HeaderValue::from_str(location).map_err(|e| AppError::Internal(e.into()))?;
    let mut response = status.into_response();
    response.headers_mut().insert(LOCATION, location);
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(response)
}

/// GET /api/auth/signin
pub async fn signin(
    State(state): State<AppState>,
    Query(query): Query<SigninQuery>,
) -> Result<Response> {
    let callback = safe_callback_path(query.callback_url.as_deref());
    let nonce = random_nonce();
    let state_token = state.sessions.create_state_token(&nonce, &callback)?;
    let authorize_url = state.identity.authorize_url(&state_token)?;

    let mut response = redirect(StatusCode::TEMPORARY_REDIRECT, &authorize_url)?;
    response.headers_mut().append(
        SET_COOKIE,
        cookie_header(
            STATE_COOKIE,
            &nonce,
            STATE_COOKIE_PATH,
            STATE_TOKEN_TTL_SECS,
            state.sessions.cookie_secure(),
        )?,
    );
    Ok(response)
}

/// GET /api/auth/callback
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<Response> {
    let login_path = &state.config.gate.login_path;

    if let Some(error) = query.error.as_deref() {
        tracing::info!(error = %error, "Identity provider declined sign-in");
        counter!("estate_auth_signin_total", "outcome" => "declined").increment(1);
        return redirect(StatusCode::SEE_OTHER, &format!("{}?error=signin_declined", login_path));
    }

    let (code, state_param) = match (query.code.as_deref(), query.state.as_deref()) {
        (Some(code), Some(st)) if !code.is_empty() && !st.is_empty() => (code, st),
        _ => return Err(AppError::BadRequest("Missing code or state".to_string())),
    };

    let claims = state
        .sessions
        .verify_state_token(state_param)
        .map_err(|_| AppError::BadRequest("Invalid state".to_string()))?;

    let jar = CookieJar::from_headers(&headers);
    let pinned = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    if pinned.as_deref() != Some(claims.nonce.as_str()) {
        tracing::warn!("OAuth state nonce does not match the initiating browser");
        counter!("estate_auth_signin_total", "outcome" => "state_mismatch").increment(1);
        return Err(AppError::BadRequest("Invalid state".to_string()));
    }

    let tokens = state.identity.exchange_code(code).await?;
    let info = state.identity.fetch_userinfo(&tokens.access_token).await?;
    let email = info.verified_email().ok_or_else(|| {
        counter!("estate_auth_signin_total", "outcome" => "no_email").increment(1);
        AppError::Unauthorized("A verified email address is required to sign in".to_string())
    })?;

    let session_token = state
        .sessions
        .create_session_token(&info.sub, email, info.name.as_deref())?;

    tracing::info!(subject = %info.sub, "User signed in");
    counter!("estate_auth_signin_total", "outcome" => "success").increment(1);

    let secure = state.sessions.cookie_secure();
    let mut response = redirect(StatusCode::SEE_OTHER, &safe_callback_path(Some(&claims.callback_url)))?;
    let response_headers = response.headers_mut();
    response_headers.append(
        SET_COOKIE,
        cookie_header(
            state.sessions.cookie_name(),
            &session_token,
            "/",
            state.sessions.ttl_secs(),
            secure,
        )?,
    );
    response_headers.append(
        SET_COOKIE,
        cookie_header(STATE_COOKIE, "", STATE_COOKIE_PATH, 0, secure)?,
    );
    Ok(response)
}

/// GET /api/auth/session
///
/// `{}` when signed out, otherwise the user and session expiry.
pub async fn session(OptionalPrincipal(principal): OptionalPrincipal) -> Response {
    let Some(principal) = principal else {
        return Json(serde_json::json!({})).into_response();
    };

    let expires = Utc
        .timestamp_opt(principal.expires_at, 0)
        .single()
        .map(|t| t.to_rfc3339())
        .unwrap_or_default();

    Json(SessionResponse {
        user: SessionUser {
            email: principal.email,
            name: principal.name,
        },
        expires,
    })
    .into_response()
}

/// POST /api/auth/signout
pub async fn signout(State(state): State<AppState>) -> Result<Response> {
    let mut response = redirect(StatusCode::SEE_OTHER, &state.config.gate.login_path)?;
    response.headers_mut().append(
        SET_COOKIE,
        cookie_header(
            state.sessions.cookie_name(),
            "",
            "/",
            0,
            state.sessions.cookie_secure(),
        )?,
    );
    Ok(response)
}
