//! Notary request handlers

use axum::{extract::State, response::Response};

use super::{proxy_json, Inbound};
use crate::error::Result;
use crate::middleware::OptionalPrincipal;
use crate::policy::routes;
use crate::state::AppState;

/// GET /api/notary
pub async fn list(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    inbound: Inbound,
) -> Result<Response> {
    proxy_json(&state, &routes::NOTARY, None, principal.as_ref(), inbound).await
}

/// POST /api/notary
pub async fn create(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    inbound: Inbound,
) -> Result<Response> {
    proxy_json(&state, &routes::NOTARY, None, principal.as_ref(), inbound).await
}
