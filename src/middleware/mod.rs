//! HTTP middleware for the estate gateway
//!
//! - Session principal extractors and the session gate
//! - Security headers, path guard and error normalization
//! - Request tracing and metrics

pub mod auth;
pub mod error_response;
pub mod metrics;
pub mod path_guard;
pub mod security_headers;
pub mod session_gate;
pub mod trace;

pub use auth::{OptionalPrincipal, Principal};
pub use error_response::normalize_error_response;
pub use metrics::ObservabilityLayer;
pub use path_guard::path_guard_middleware;
pub use security_headers::security_headers_middleware;
pub use session_gate::{session_gate_middleware, SessionGateState};
pub use trace::SanitizedMakeSpan;
