//! Unified error handling for the estate gateway

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::crypto::EncryptionError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Upstream could not be reached (connection refused, DNS, TLS, ...)
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Upstream did not answer within the configured deadline
    #[error("Upstream timed out: {0}")]
    UpstreamTimeout(String),

    /// Upstream answered with a body this gateway cannot relay
    #[error("Invalid upstream response: {0}")]
    InvalidUpstreamResponse(String),

    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Encryption error: {0}")]
    Encryption(#[from] EncryptionError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl AppError {
    /// Status, machine-readable code and the message safe to show a caller
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::UnsupportedMediaType(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_media_type",
                msg.clone(),
            ),
            AppError::UpstreamUnavailable(detail) => {
                tracing::error!("Upstream unavailable: {}", detail);
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_unavailable",
                    "Upstream service unavailable".to_string(),
                )
            }
            AppError::UpstreamTimeout(detail) => {
                tracing::error!("Upstream timed out: {}", detail);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "upstream_timeout",
                    "Upstream service timed out".to_string(),
                )
            }
            AppError::InvalidUpstreamResponse(detail) => {
                tracing::error!("Invalid upstream response: {}", detail);
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_invalid_response",
                    "Invalid response from upstream service".to_string(),
                )
            }
            AppError::IdentityProvider(detail) => {
                tracing::error!("Identity provider error: {}", detail);
                (
                    StatusCode::BAD_GATEWAY,
                    "identity_provider_error",
                    "Authentication service error".to_string(),
                )
            }
            AppError::Jwt(e) => {
                tracing::debug!("JWT error: {:?}", e);
                (
                    StatusCode::UNAUTHORIZED,
                    "unauthorized",
                    "Invalid or expired session".to_string(),
                )
            }
            AppError::Encryption(e) => {
                tracing::error!("Encryption error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "encryption_error",
                    "An encryption error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.parts().0
    }

    /// Message shown to end users (pages render this inline)
    pub fn public_message(&self) -> String {
        self.parts().2
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error) = self.parts();
        (status, Json(ErrorResponse { error, code })).into_response()
    }
}
