//! Upstream service client
//!
//! Every proxy handler funnels through [`UpstreamClient::send`], which applies
//! the per-attempt deadline and the retry policy and maps transport failures
//! onto [`AppError`] variants with fixed public messages.

pub mod relay;

use axum::body::Bytes;
use axum::http::{header, Method, StatusCode};
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;

use crate::config::UpstreamConfig;
use crate::error::{AppError, Result};

pub use relay::{relay_json, relay_pdf};

/// Header carrying the session principal's email to the upstream
pub const USER_EMAIL_HEADER: &str = "x-user-email";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Retry policy for idempotent upstream calls
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_ms),
            max_delay: Duration::from_millis(config.retry_max_ms),
        }
    }

    /// Only verbs the upstream treats as idempotent are ever repeated
    pub fn allows(&self, method: &Method) -> bool {
        self.max_retries > 0
            && matches!(
                *method,
                Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS
            )
    }

    /// Backoff before retry number `attempt` (0-based): base * 2^attempt, capped
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Whether an upstream status signals a transient gateway-side failure
fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Body forwarded to the upstream
#[derive(Debug, Clone)]
pub enum UpstreamBody {
    Empty,
    /// JSON text, forwarded byte for byte
    Json(Bytes),
    /// Opaque body with its original content type (multipart uploads)
    Raw { content_type: String, bytes: Bytes },
}

/// One logical upstream call
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    /// Resource path, already expanded (`/wills/42`)
    pub path: String,
    /// Original query string, forwarded verbatim
    pub query: Option<String>,
    pub body: UpstreamBody,
    pub user_email: Option<String>,
    pub request_id: Option<String>,
}

impl UpstreamRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            body: UpstreamBody::Empty,
            user_email: None,
            request_id: None,
        }
    }

    pub fn query(mut self, query: Option<String>) -> Self {
        self.query = query.filter(|q| !q.is_empty());
        self
    }

    pub fn body(mut self, body: UpstreamBody) -> Self {
        self.body = body;
        self
    }

    pub fn user_email(mut self, email: Option<String>) -> Self {
        self.user_email = email;
        self
    }

    pub fn request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }
}

/// Map a reqwest failure to the public error taxonomy
pub(crate) fn transport_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::UpstreamTimeout(e.to_string())
    } else {
        AppError::UpstreamUnavailable(e.to_string())
    }
}

/// Pooled HTTP client for the upstream service
#[derive(Clone)]
pub struct UpstreamClient {
    http_client: reqwest::Client,
    base_url: Arc<str>,
    retry: RetryPolicy,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
            .build()?;

        Ok(Self {
            http_client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            retry: RetryPolicy::from_config(config),
        })
    }

    /// Full upstream URL for a resource path and optional query
    pub fn url_for(&self, path: &str, query: Option<&str>) -> String {
        match query {
            Some(q) if !q.is_empty() => format!("{}{}?{}", self.base_url, path, q),
            _ => format!("{}{}", self.base_url, path),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Send a request, retrying idempotent verbs on transport failure and
    /// on 502/503/504. Non-success statuses are returned as responses; only
    /// transport failures become errors.
    pub async fn send(&self, request: &UpstreamRequest) -> Result<reqwest::Response> {
        let retryable_verb = self.retry.allows(&request.method);
        let mut attempt = 0u32;

        loop {
            let outcome = self.attempt(request).await;

            let transient = match &outcome {
                Ok(resp) => is_retryable_status(resp.status()),
                Err(_) => true,
            };

            if !(transient && retryable_verb && attempt < self.retry.max_retries) {
                record_outcome(&request.method, &outcome);
                return outcome.map_err(transport_error);
            }

            let delay = self.retry.delay_for(attempt);
            match &outcome {
                Ok(resp) => tracing::warn!(
                    method = %request.method,
                    path = %request.path,
                    status = resp.status().as_u16(),
                    attempt = attempt + 1,
                    "Upstream returned transient status, retrying in {:?}",
                    delay
                ),
                Err(e) => tracing::warn!(
                    method = %request.method,
                    path = %request.path,
                    attempt = attempt + 1,
                    "Upstream call failed: {}, retrying in {:?}",
                    e,
                    delay
                ),
            }
            counter!("estate_upstream_retries_total", "method" => request.method.to_string())
                .increment(1);

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, request: &UpstreamRequest) -> reqwest::Result<reqwest::Response> {
        let url = self.url_for(&request.path, request.query.as_deref());
        let mut builder = self
            .http_client
            .request(request.method.clone(), &url)
            .header(header::ACCEPT, "application/json, application/pdf;q=0.9, */*;q=0.5");

        if let Some(email) = &request.user_email {
            builder = builder.header(USER_EMAIL_HEADER, email);
        }
        if let Some(id) = &request.request_id {
            builder = builder.header(REQUEST_ID_HEADER, id);
        }

        builder = match &request.body {
            UpstreamBody::Empty => builder,
            UpstreamBody::Json(bytes) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(bytes.clone()),
            UpstreamBody::Raw {
                content_type,
                bytes,
            } => builder
                .header(header::CONTENT_TYPE, content_type)
                .body(bytes.clone()),
        };

        builder.send().await
    }

    /// Reachability check for readiness: any HTTP answer counts as reachable
    pub async fn ping(&self) -> Result<StatusCode> {
        self.http_client
            .get(self.url_for("/", None))
            .send()
            .await
            .map(|resp| resp.status())
            .map_err(transport_error)
    }
}

fn record_outcome(method: &Method, outcome: &reqwest::Result<reqwest::Response>) {
    let label = match outcome {
        Ok(resp) if resp.status().is_success() => "success",
        Ok(resp) if resp.status().is_client_error() => "client_error",
        Ok(_) => "server_error",
        Err(e) if e.is_timeout() => "timeout",
        Err(_) => "unavailable",
    };
    counter!("estate_upstream_requests_total", "method" => method.to_string(), "outcome" => label)
        .increment(1);
}
