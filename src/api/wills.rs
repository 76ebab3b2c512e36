//! Will handlers
//!
//! Wills are addressed by the owner's `user_email`, which must match the
//! session on every call.

use axum::{
    extract::{Path, State},
    response::Response,
};

use super::{proxy_json, proxy_pdf, Inbound};
use crate::error::Result;
use crate::middleware::OptionalPrincipal;
use crate::policy::routes;
use crate::state::AppState;

/// GET /api/wills
pub async fn list(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    inbound: Inbound,
) -> Result<Response> {
    proxy_json(&state, &routes::WILLS, None, principal.as_ref(), inbound).await
}

/// POST /api/wills
pub async fn create(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    inbound: Inbound,
) -> Result<Response> {
    proxy_json(&state, &routes::WILLS, None, principal.as_ref(), inbound).await
}

/// GET /api/wills/{id}
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OptionalPrincipal(principal): OptionalPrincipal,
    inbound: Inbound,
) -> Result<Response> {
    proxy_json(&state, &routes::WILL, Some(&id), principal.as_ref(), inbound).await
}

/// PUT /api/wills/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OptionalPrincipal(principal): OptionalPrincipal,
    inbound: Inbound,
) -> Result<Response> {
    proxy_json(&state, &routes::WILL, Some(&id), principal.as_ref(), inbound).await
}

/// GET /api/wills/{id}/pdf
pub async fn pdf(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OptionalPrincipal(principal): OptionalPrincipal,
    inbound: Inbound,
) -> Result<Response> {
    let filename = pdf_filename(&id);
    proxy_pdf(
        &state,
        &routes::WILL_PDF,
        Some(&id),
        principal.as_ref(),
        inbound,
        &filename,
    )
    .await
}

fn pdf_filename(id: &str) -> String {
    format!("will-{}.pdf", id)
}
