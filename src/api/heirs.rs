//! Heir handlers
//!
//! Heir records carry no owner email; the upstream scopes them by the
//! `X-User-Email` header attached for any signed-in caller.

use axum::{extract::State, response::Response};

use super::{proxy_json, Inbound};
use crate::error::Result;
use crate::middleware::OptionalPrincipal;
use crate::policy::routes;
use crate::state::AppState;

/// GET /api/heirs
pub async fn list(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    inbound: Inbound,
) -> Result<Response> {
    proxy_json(&state, &routes::HEIRS, None, principal.as_ref(), inbound).await
}

/// POST /api/heirs
pub async fn create(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    inbound: Inbound,
) -> Result<Response> {
    proxy_json(&state, &routes::HEIRS, None, principal.as_ref(), inbound).await
}
