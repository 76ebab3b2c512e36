//! HTTP server: router assembly and startup

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::api;
use crate::config::{Config, CorsConfig};
use crate::middleware::{
    normalize_error_response, path_guard_middleware, security_headers_middleware,
    session_gate_middleware, ObservabilityLayer, SanitizedMakeSpan, SessionGateState,
};
use crate::pages;
use crate::state::AppState;

/// CORS for browser clients on other origins. With no configured origins no
/// CORS headers are sent and only same-origin pages can call the API.
fn build_cors(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
        .allow_credentials(true)
}

/// Build the HTTP router
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();
    let gate = SessionGateState::new(state.sessions.clone(), &config.gate);

    Router::new()
        // Operational endpoints
        .route("/health", get(api::health::health))
        .route("/ready", get(api::health::ready))
        .route("/metrics", get(api::metrics::metrics_handler))
        // Sign-in
        .route("/api/auth/signin", get(api::auth::signin))
        .route("/api/auth/callback", get(api::auth::callback))
        .route("/api/auth/session", get(api::auth::session))
        .route("/api/auth/signout", post(api::auth::signout))
        // Proxied resources
        .route("/api/users", post(api::users::create))
        .route("/api/wills", get(api::wills::list).post(api::wills::create))
        .route(
            "/api/wills/{id}",
            get(api::wills::get).put(api::wills::update),
        )
        .route("/api/wills/{id}/pdf", get(api::wills::pdf))
        .route("/api/documents/list", get(api::documents::list))
        .route(
            "/api/documents/upload",
            post(api::documents::upload)
                .layer(DefaultBodyLimit::max(config.upstream.max_upload_bytes)),
        )
        .route("/api/heirs", get(api::heirs::list).post(api::heirs::create))
        .route("/api/notary", get(api::notary::list).post(api::notary::create))
        .route("/api/bot/grief", post(api::bot::grief))
        .route("/api/bot/help", post(api::bot::help))
        .route("/api/compliance/rules", get(api::compliance::rules))
        .route("/api/compliance/summary", get(api::compliance::summary))
        .route("/api/pet-trust/save", post(api::pet_trust::save))
        .route("/api/pet-trust/pdf", post(api::pet_trust::pdf))
        .route(
            "/api/payments/create-checkout",
            post(api::payments::create_checkout),
        )
        .route("/api/payments/status", get(api::payments::status))
        .route("/api/live/event", post(api::live::event))
        .route("/api/live/status", get(api::live::status))
        // Pages
        .route("/", get(pages::dashboard))
        .route("/login", get(pages::login))
        .route("/dashboard", get(pages::dashboard))
        .route("/dashboard/wills", get(pages::wills))
        .route("/dashboard/documents", get(pages::documents))
        .route(
            "/dashboard/heirs",
            get(pages::heirs).post(pages::add_heir),
        )
        .route("/dashboard/notary", get(pages::notary))
        .route("/dashboard/compliance", get(pages::compliance))
        .route("/assets/forms.js", get(pages::forms_js))
        // Middleware (last added runs first)
        .layer(axum::middleware::from_fn(normalize_error_response))
        .layer(axum::middleware::from_fn_with_state(
            gate,
            session_gate_middleware,
        ))
        .layer(axum::middleware::from_fn(path_guard_middleware))
        .layer(axum::middleware::from_fn_with_state(
            config.security_headers.clone(),
            security_headers_middleware,
        ))
        .layer(build_cors(&config.cors))
        .layer(TraceLayer::new_for_http().make_span_with(SanitizedMakeSpan))
        .layer(ObservabilityLayer)
        .with_state(state)
}

/// Run the HTTP server until Ctrl-C / SIGTERM
pub async fn run(config: Config, metrics_handle: Option<PrometheusHandle>) -> anyhow::Result<()> {
    let http_addr = config.http_addr();
    info!(upstream = %config.upstream.base_url, "Proxying to upstream");

    let state = AppState::new(config, metrics_handle)?;
    let app = build_router(state);

    let listener = TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("Failed to bind {}", http_addr))?;
    info!("HTTP server started on {}", http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

