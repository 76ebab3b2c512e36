//! REST API handlers and the shared forwarding path
//!
//! Resource handlers are thin: each names its [`ProxyRoute`] and hands the
//! inbound request to [`proxy_json`] or [`proxy_pdf`], which apply the access
//! policy, call the upstream and relay the answer.

pub mod auth;
pub mod bot;
pub mod compliance;
pub mod documents;
pub mod health;
pub mod heirs;
pub mod live;
pub mod metrics;
pub mod notary;
pub mod payments;
pub mod pet_trust;
pub mod users;
pub mod wills;

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Multipart, Request},
    http::{header, Extensions, HeaderValue, Method},
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::middleware::Principal;
use crate::policy::{self, ProxyRoute};
use crate::state::AppState;
use crate::upstream::{relay_json, relay_pdf, UpstreamBody, UpstreamRequest};

/// The parts of an inbound request that are forwarded upstream
#[derive(Debug, Clone)]
pub struct Inbound {
    pub method: Method,
    /// Raw query string, forwarded verbatim
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
    pub request_id: Option<String>,
    /// Extensions of the original request; carries the route's body limit
    /// when the multipart body is re-read
    extensions: Extensions,
}

/// Value recorded for a multipart file part; never a valid email
const FILE_PART: &str = "<file>";

impl Inbound {
    /// A body-less request, as issued by server-rendered pages
    pub fn new(method: Method, query: Option<String>) -> Self {
        Self {
            method,
            query,
            content_type: None,
            body: Bytes::new(),
            request_id: None,
            extensions: Extensions::new(),
        }
    }

    /// A JSON-bodied request, as issued by server-rendered forms
    pub fn with_json(mut self, body: &Value) -> Self {
        self.content_type = Some("application/json".to_string());
        self.body = Bytes::from(body.to_string());
        self
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    /// Decoded query pairs, duplicates preserved in order
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query
            .as_deref()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn is_multipart(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.starts_with("multipart/"))
            .unwrap_or(false)
    }

    /// Parse the body as JSON. Empty and multipart bodies have no JSON view.
    pub fn json_body(&self) -> Result<Option<Value>> {
        if self.body.iter().all(u8::is_ascii_whitespace) || self.is_multipart() {
            return Ok(None);
        }
        serde_json::from_slice(&self.body)
            .map(Some)
            .map_err(|_| AppError::BadRequest("Invalid JSON body".to_string()))
    }

    /// Named body fields as seen by the access policy: top-level JSON
    /// fields, or the parts of a multipart form.
    pub async fn body_fields(&self) -> Result<Vec<(String, String)>> {
        if self.is_multipart() {
            return self.multipart_fields().await;
        }
        Ok(self
            .json_body()?
            .map(|body| policy::json_fields(&body))
            .unwrap_or_default())
    }

    /// Text parts are read in full. File parts are recorded by name only.
    async fn multipart_fields(&self) -> Result<Vec<(String, String)>> {
        let content_type = HeaderValue::from_str(self.content_type.as_deref().unwrap_or_default())
            .map_err(|_| AppError::BadRequest("Invalid content type".to_string()))?;

        let mut request = Request::new(Body::from(self.body.clone()));
        *request.extensions_mut() = self.extensions.clone();
        request
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);

        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|_| AppError::BadRequest("Invalid multipart body".to_string()))?;

        let mut fields = Vec::new();
        while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if field.file_name().is_some() {
                fields.push((name, FILE_PART.to_string()));
            } else {
                let value = field.text().await.map_err(invalid_multipart)?;
                fields.push((name, value));
            }
        }
        Ok(fields)
    }

    fn upstream_body(&self) -> UpstreamBody {
        if self.body.is_empty() {
            UpstreamBody::Empty
        } else if self.is_multipart() {
            UpstreamBody::Raw {
                content_type: self.content_type.clone().unwrap_or_default(),
                bytes: self.body.clone(),
            }
        } else {
            UpstreamBody::Json(self.body.clone())
        }
    }
}

impl<S> FromRequest<S> for Inbound
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let method = req.method().clone();
        let query = req.uri().query().map(String::from);
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let request_id = req
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let extensions = req.extensions().clone();

        let body = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;

        Ok(Self {
            method,
            query,
            content_type,
            body,
            request_id,
            extensions,
        })
    }
}

fn invalid_multipart(e: axum::extract::multipart::MultipartError) -> AppError {
    tracing::debug!(error = %e, "Unreadable multipart body");
    AppError::BadRequest("Invalid multipart body".to_string())
}

/// Authorize and forward one request to the upstream.
///
/// All policy checks complete before the upstream is contacted.
pub(crate) async fn forward(
    state: &AppState,
    route: &ProxyRoute,
    id: Option<&str>,
    principal: Option<&Principal>,
    inbound: &Inbound,
) -> Result<reqwest::Response> {
    if inbound.is_multipart() && !route.accepts_multipart {
        return Err(AppError::UnsupportedMediaType(
            "Multipart bodies are only accepted for document uploads".to_string(),
        ));
    }

    let body = inbound.body_fields().await?;
    let query = inbound.query_pairs();
    let caller = policy::authorize(route.policy, principal, &query, &body)?;

    tracing::debug!(route = route.name, method = %inbound.method, "Forwarding to upstream");

    let request = UpstreamRequest::new(inbound.method.clone(), route.path_with_id(id))
        .query(inbound.query.clone())
        .body(inbound.upstream_body())
        .user_email(caller.map(|p| p.email))
        .request_id(inbound.request_id.clone());

    state.upstream.send(&request).await
}

/// Forward and relay a JSON response
pub(crate) async fn proxy_json(
    state: &AppState,
    route: &ProxyRoute,
    id: Option<&str>,
    principal: Option<&Principal>,
    inbound: Inbound,
) -> Result<Response> {
    let resp = forward(state, route, id, principal, &inbound).await?;
    relay_json(resp).await
}

/// Forward and stream a binary download
pub(crate) async fn proxy_pdf(
    state: &AppState,
    route: &ProxyRoute,
    id: Option<&str>,
    principal: Option<&Principal>,
    inbound: Inbound,
    filename: &str,
) -> Result<Response> {
    let resp = forward(state, route, id, principal, &inbound).await?;
    relay_pdf(resp, filename).await
}
