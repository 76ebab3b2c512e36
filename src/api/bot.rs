//! Assistant chat handlers

use axum::{extract::State, response::Response};

use super::{proxy_json, Inbound};
use crate::error::Result;
use crate::middleware::OptionalPrincipal;
use crate::policy::routes;
use crate::state::AppState;

/// POST /api/bot/grief
pub async fn grief(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    inbound: Inbound,
) -> Result<Response> {
    proxy_json(&state, &routes::BOT_GRIEF, None, principal.as_ref(), inbound).await
}

/// POST /api/bot/help
pub async fn help(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    inbound: Inbound,
) -> Result<Response> {
    proxy_json(&state, &routes::BOT_HELP, None, principal.as_ref(), inbound).await
}
