//! Session token handling
//!
//! Session tokens are HS256 JWTs signed with `SESSION_SECRET`. The same key
//! signs the short-lived OAuth `state` tokens used by the sign-in round trip,
//! so the gateway needs no server-side session store.

use crate::config::SessionConfig;
use crate::error::{AppError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Audience for every token this gateway issues
pub const TOKEN_AUDIENCE: &str = "estate-gateway";

const SESSION_TOKEN_TYPE: &str = "session";
const STATE_TOKEN_TYPE: &str = "oauth_state";

/// Lifetime of an OAuth state token (sign-in must complete within this window)
pub const STATE_TOKEN_TTL_SECS: i64 = 300;

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (identity provider's stable user id)
    pub sub: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub iss: String,
    pub aud: String,
    /// Token type discriminator (prevents token confusion attacks)
    #[serde(default)]
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

/// OAuth `state` claims carried through the identity provider round trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateClaims {
    /// Random value also stored in a cookie on the initiating browser
    pub nonce: String,
    /// Where to send the browser once sign-in completes
    pub callback_url: String,
    pub iss: String,
    pub aud: String,
    #[serde(default)]
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies session tokens
#[derive(Clone)]
pub struct SessionManager {
    config: SessionConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Validation with a 5 second leeway instead of the default 60
    fn strict_validation(&self) -> Validation {
        let mut v = Validation::new(Algorithm::HS256);
        v.leeway = 5;
        v.set_audience(&[TOKEN_AUDIENCE]);
        v.set_issuer(&[&self.config.issuer]);
        v
    }

    /// Create a session token for an authenticated principal
    pub fn create_session_token(
        &self,
        subject: &str,
        email: &str,
        name: Option<&str>,
    ) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.ttl_secs);

        let claims = SessionClaims {
            sub: subject.to_string(),
            email: email.to_string(),
            name: name.map(String::from),
            iss: self.config.issuer.clone(),
            aud: TOKEN_AUDIENCE.to_string(),
            token_type: SESSION_TOKEN_TYPE.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(e.into()))
    }

    /// Verify and decode a session token
    pub fn verify_session_token(&self, token: &str) -> Result<SessionClaims> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.strict_validation())?;
        if data.claims.token_type != SESSION_TOKEN_TYPE {
            return Err(AppError::Unauthorized("Not a session token".to_string()));
        }
        Ok(data.claims)
    }

    /// Create a signed OAuth state token
    pub fn create_state_token(&self, nonce: &str, callback_url: &str) -> Result<String> {
        let now = Utc::now();
        let claims = StateClaims {
            nonce: nonce.to_string(),
            callback_url: callback_url.to_string(),
            iss: self.config.issuer.clone(),
            aud: TOKEN_AUDIENCE.to_string(),
            token_type: STATE_TOKEN_TYPE.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(STATE_TOKEN_TTL_SECS)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(e.into()))
    }

    /// Verify an OAuth state token
    pub fn verify_state_token(&self, token: &str) -> Result<StateClaims> {
        let data = decode::<StateClaims>(token, &self.decoding_key, &self.strict_validation())?;
        if data.claims.token_type != STATE_TOKEN_TYPE {
            return Err(AppError::BadRequest("Invalid state".to_string()));
        }
        Ok(data.claims)
    }

    pub fn ttl_secs(&self) -> i64 {
        self.config.ttl_secs
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    pub fn cookie_secure(&self) -> bool {
        self.config.cookie_secure
    }
}
