//! Live session handlers

use axum::{extract::State, response::Response};

use super::{proxy_json, Inbound};
use crate::error::Result;
use crate::middleware::OptionalPrincipal;
use crate::policy::routes;
use crate::state::AppState;

/// POST /api/live/event
pub async fn event(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    inbound: Inbound,
) -> Result<Response> {
    proxy_json(&state, &routes::LIVE_EVENT, None, principal.as_ref(), inbound).await
}

/// GET /api/live/status
pub async fn status(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    inbound: Inbound,
) -> Result<Response> {
    proxy_json(&state, &routes::LIVE_STATUS, None, principal.as_ref(), inbound).await
}
