//! HTTP observability middleware
//!
//! Implemented as a Tower Layer/Service to avoid axum's `from_fn` layer count limits.
//! Combines request ID propagation and metrics recording.

use axum::{body::Body, http::Request, response::Response};
use metrics::{counter, gauge, histogram};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tower Layer for HTTP observability (request ID + metrics).
#[derive(Clone)]
pub struct ObservabilityLayer;

impl<S> Layer<S> for ObservabilityLayer {
    type Service = ObservabilityMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ObservabilityMiddleware { inner }
    }
}

/// Tower Service that records HTTP metrics and propagates request IDs.
#[derive(Clone)]
pub struct ObservabilityMiddleware<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for ObservabilityMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let method = request.method().to_string();
        let path = normalize_path(request.uri().path());

        // Reuse the caller's request ID when it is a sane token, else mint one
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty() && s.len() <= 128)
            .map(|s| s.to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if let Ok(val) = request_id.parse() {
            request.headers_mut().insert(REQUEST_ID_HEADER, val);
        }

        gauge!("estate_http_requests_in_flight").increment(1.0);
        let start = Instant::now();

        // Swap in the clone that was driven to readiness
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let span = tracing::info_span!("request", request_id = %request_id);

        Box::pin(
            async move {
                let result = inner.call(request).await;
                gauge!("estate_http_requests_in_flight").decrement(1.0);
                let mut response = result?;

                let duration = start.elapsed().as_secs_f64();
                let status = response.status().as_u16().to_string();

                counter!("estate_http_requests_total", "method" => method.clone(), "path" => path.clone(), "status" => status)
                    .increment(1);
                histogram!("estate_http_request_duration_seconds", "method" => method, "path" => path)
                    .record(duration);

                if let Ok(val) = request_id.parse() {
                    response.headers_mut().insert(REQUEST_ID_HEADER, val);
                }

                Ok(response)
            }
            .instrument(span),
        )
    }
}

/// Collapse id-like path segments to `{id}` to keep label cardinality bounded.
///
/// Resource ids come from the upstream, so anything containing a digit or
/// longer than 24 characters is treated as an id.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|seg| if looks_like_id(seg) { "{id}" } else { seg })
        .collect::<Vec<_>>()
        .join("/")
}

fn looks_like_id(s: &str) -> bool {
    !s.is_empty() && (s.len() > 24 || s.chars().any(|c| c.is_ascii_digit()))
}
