//! Pet trust handlers

use axum::{extract::State, response::Response};

use super::{proxy_json, proxy_pdf, Inbound};
use crate::error::Result;
use crate::middleware::OptionalPrincipal;
use crate::policy::routes;
use crate::state::AppState;

const PDF_FILENAME: &str = "pet-trust.pdf";

/// POST /api/pet-trust/save
pub async fn save(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    inbound: Inbound,
) -> Result<Response> {
    proxy_json(&state, &routes::PET_TRUST_SAVE, None, principal.as_ref(), inbound).await
}

/// POST /api/pet-trust/pdf
///
/// Renders the submitted trust details to a PDF download.
pub async fn pdf(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    inbound: Inbound,
) -> Result<Response> {
    proxy_pdf(
        &state,
        &routes::PET_TRUST_PDF,
        None,
        principal.as_ref(),
        inbound,
        PDF_FILENAME,
    )
    .await
}
