//! Payment handlers
//!
//! Checkout creation is a POST and therefore never retried by the gateway.

use axum::{extract::State, response::Response};

use super::{proxy_json, Inbound};
use crate::error::Result;
use crate::middleware::OptionalPrincipal;
use crate::policy::routes;
use crate::state::AppState;

/// POST /api/payments/create-checkout
pub async fn create_checkout(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    inbound: Inbound,
) -> Result<Response> {
    proxy_json(&state, &routes::PAYMENTS_CHECKOUT, None, principal.as_ref(), inbound).await
}

/// GET /api/payments/status
pub async fn status(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    inbound: Inbound,
) -> Result<Response> {
    proxy_json(&state, &routes::PAYMENTS_STATUS, None, principal.as_ref(), inbound).await
}
