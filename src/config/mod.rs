//! Configuration management for the estate gateway

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Upstream service configuration
    pub upstream: UpstreamConfig,
    /// Session token configuration
    pub session: SessionConfig,
    /// External identity provider configuration
    pub identity: IdentityProviderConfig,
    /// Session gate configuration
    pub gate: SessionGateConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Security headers configuration
    pub security_headers: SecurityHeadersConfig,
    /// Logging and metrics configuration
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL every proxied resource path is appended to (e.g. http://backend:8000)
    pub base_url: String,
    /// Deadline for a single upstream attempt
    pub timeout_secs: u64,
    /// Extra attempts for idempotent verbs (0 disables retries)
    pub max_retries: u32,
    /// First backoff delay; doubles on every retry
    pub retry_base_ms: u64,
    /// Upper bound for a single backoff delay
    pub retry_max_ms: u64,
    /// Largest multipart upload accepted by the document upload route
    pub max_upload_bytes: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
            max_retries: 2,
            retry_base_ms: 200,
            retry_max_ms: 2_000,
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_secs: i64,
    pub cookie_name: String,
    /// Mark the session cookie `Secure` (disable only for plain-HTTP local dev)
    pub cookie_secure: bool,
}

#[derive(Debug, Clone)]
pub struct IdentityProviderConfig {
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scopes: String,
    /// Public URL of this gateway, used to build the OAuth redirect URI
    pub app_public_url: String,
}

impl IdentityProviderConfig {
    /// Redirect URI registered with the identity provider
    pub fn redirect_uri(&self) -> String {
        format!(
            "{}/api/auth/callback",
            self.app_public_url.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Clone)]
pub struct SessionGateConfig {
    /// Path prefixes that require an authenticated session
    pub protected_paths: Vec<String>,
    /// Where unauthenticated requests to protected paths are sent
    pub login_path: String,
}

impl Default for SessionGateConfig {
    fn default() -> Self {
        Self {
            protected_paths: vec!["/dashboard".to_string(), "/settings".to_string()],
            login_path: "/login".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    /// Allowed origins; empty means same-origin only
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SecurityHeadersConfig {
    pub hsts_enabled: bool,
    /// Only emit HSTS when the request arrived over HTTPS
    pub hsts_https_only: bool,
    /// Trust `X-Forwarded-Proto` from the fronting proxy
    pub hsts_trust_x_forwarded_proto: bool,
    pub hsts_max_age_secs: u64,
    pub hsts_include_subdomains: bool,
    pub hsts_preload: bool,
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            hsts_enabled: true,
            hsts_https_only: true,
            hsts_trust_x_forwarded_proto: true,
            hsts_max_age_secs: 31_536_000,
            hsts_include_subdomains: true,
            hsts_preload: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "json" for structured logs, anything else for human-readable output
    pub log_format: String,
    pub metrics_enabled: bool,
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            service_name: "estate-gateway".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let upstream_defaults = UpstreamConfig::default();
        let gate_defaults = SessionGateConfig::default();
        let headers_defaults = SecurityHeadersConfig::default();
        let telemetry_defaults = TelemetryConfig::default();

        let app_public_url =
            env::var("APP_PUBLIC_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            upstream: UpstreamConfig {
                base_url: env::var("UPSTREAM_BASE_URL")
                    .context("UPSTREAM_BASE_URL is required")?
                    .trim_end_matches('/')
                    .to_string(),
                timeout_secs: parse_or("UPSTREAM_TIMEOUT_SECS", upstream_defaults.timeout_secs)?,
                max_retries: parse_or("UPSTREAM_MAX_RETRIES", upstream_defaults.max_retries)?,
                retry_base_ms: parse_or("UPSTREAM_RETRY_BASE_MS", upstream_defaults.retry_base_ms)?,
                retry_max_ms: parse_or("UPSTREAM_RETRY_MAX_MS", upstream_defaults.retry_max_ms)?,
                max_upload_bytes: parse_or(
                    "UPSTREAM_MAX_UPLOAD_BYTES",
                    upstream_defaults.max_upload_bytes,
                )?,
            },
            session: SessionConfig {
                secret: env::var("SESSION_SECRET").context("SESSION_SECRET is required")?,
                issuer: env::var("SESSION_ISSUER").unwrap_or_else(|_| app_public_url.clone()),
                ttl_secs: parse_or("SESSION_TTL_SECS", 30 * 24 * 3600)?,
                cookie_name: env::var("SESSION_COOKIE_NAME")
                    .unwrap_or_else(|_| "estate_session".to_string()),
                cookie_secure: parse_bool("SESSION_COOKIE_SECURE", true),
            },
            identity: IdentityProviderConfig {
                authorize_url: env::var("OIDC_AUTHORIZE_URL")
                    .unwrap_or_else(|_| "https://accounts.google.com/o/oauth2/v2/auth".to_string()),
                token_url: env::var("OIDC_TOKEN_URL")
                    .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string()),
                userinfo_url: env::var("OIDC_USERINFO_URL").unwrap_or_else(|_| {
                    "https://openidconnect.googleapis.com/v1/userinfo".to_string()
                }),
                client_id: env::var("OIDC_CLIENT_ID").context("OIDC_CLIENT_ID is required")?,
                client_secret: env::var("OIDC_CLIENT_SECRET").unwrap_or_default(),
                scopes: env::var("OIDC_SCOPES")
                    .unwrap_or_else(|_| "openid email profile".to_string()),
                app_public_url,
            },
            gate: SessionGateConfig {
                protected_paths: env::var("PROTECTED_PATHS")
                    .map(|s| parse_list(&s))
                    .unwrap_or(gate_defaults.protected_paths),
                login_path: env::var("LOGIN_PATH").unwrap_or(gate_defaults.login_path),
            },
            cors: CorsConfig {
                allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                    .map(|s| parse_list(&s))
                    .unwrap_or_default(),
            },
            security_headers: SecurityHeadersConfig {
                hsts_enabled: parse_bool("HSTS_ENABLED", headers_defaults.hsts_enabled),
                hsts_https_only: parse_bool("HSTS_HTTPS_ONLY", headers_defaults.hsts_https_only),
                hsts_trust_x_forwarded_proto: parse_bool(
                    "HSTS_TRUST_X_FORWARDED_PROTO",
                    headers_defaults.hsts_trust_x_forwarded_proto,
                ),
                hsts_max_age_secs: parse_or("HSTS_MAX_AGE_SECS", headers_defaults.hsts_max_age_secs)?,
                hsts_include_subdomains: parse_bool(
                    "HSTS_INCLUDE_SUBDOMAINS",
                    headers_defaults.hsts_include_subdomains,
                ),
                hsts_preload: parse_bool("HSTS_PRELOAD", headers_defaults.hsts_preload),
            },
            telemetry: TelemetryConfig {
                log_format: env::var("LOG_FORMAT").unwrap_or(telemetry_defaults.log_format),
                metrics_enabled: parse_bool("METRICS_ENABLED", telemetry_defaults.metrics_enabled),
                service_name: env::var("SERVICE_NAME").unwrap_or(telemetry_defaults.service_name),
            },
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

/// Parse an optional numeric variable, failing loudly on garbage instead of
/// silently falling back.
fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", key)),
        Err(_) => Ok(default),
    }
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|s| matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

/// Split a comma-separated list, dropping blanks
pub(crate) fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
