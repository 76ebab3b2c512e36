//! User registration handler

use axum::{extract::State, response::Response};

use super::{proxy_json, Inbound};
use crate::error::Result;
use crate::middleware::OptionalPrincipal;
use crate::policy::routes;
use crate::state::AppState;

/// POST /api/users
///
/// Creates or refreshes the upstream user record for the signed-in caller.
pub async fn create(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    inbound: Inbound,
) -> Result<Response> {
    proxy_json(&state, &routes::USERS, None, principal.as_ref(), inbound).await
}
