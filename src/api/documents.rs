//! Document vault handlers
//!
//! Uploads are multipart and forwarded as-is with their boundary intact. The
//! owner's `email` is checked in the query string and in every text part.

use axum::{extract::State, response::Response};

use super::{proxy_json, Inbound};
use crate::error::Result;
use crate::middleware::OptionalPrincipal;
use crate::policy::routes;
use crate::state::AppState;

/// GET /api/documents/list
pub async fn list(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    inbound: Inbound,
) -> Result<Response> {
    proxy_json(&state, &routes::DOCUMENTS_LIST, None, principal.as_ref(), inbound).await
}

/// POST /api/documents/upload
pub async fn upload(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    inbound: Inbound,
) -> Result<Response> {
    tracing::info!(bytes = inbound.body.len(), "Forwarding document upload");
    proxy_json(&state, &routes::DOCUMENTS_UPLOAD, None, principal.as_ref(), inbound).await
}
