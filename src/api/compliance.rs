//! Compliance reference data. Public; no session is consulted.

use axum::{extract::State, response::Response};

use super::{proxy_json, Inbound};
use crate::error::Result;
use crate::policy::routes;
use crate::state::AppState;

/// GET /api/compliance/rules
pub async fn rules(State(state): State<AppState>, inbound: Inbound) -> Result<Response> {
    proxy_json(&state, &routes::COMPLIANCE_RULES, None, None, inbound).await
}

/// GET /api/compliance/summary
pub async fn summary(State(state): State<AppState>, inbound: Inbound) -> Result<Response> {
    proxy_json(&state, &routes::COMPLIANCE_SUMMARY, None, None, inbound).await
}
