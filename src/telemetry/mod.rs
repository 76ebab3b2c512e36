//! Telemetry initialization: structured logging and metrics

pub mod metrics;

use crate::config::TelemetryConfig;
use anyhow::Context;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "estate_gateway=info,tower_http=info";

/// Initialise logging and, when enabled, the Prometheus recorder.
///
/// Returns `Some(PrometheusHandle)` when metrics are enabled so the HTTP
/// server can expose a `/metrics` endpoint.
pub fn init(config: &TelemetryConfig) -> anyhow::Result<Option<PrometheusHandle>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    let prometheus_handle = if config.metrics_enabled {
        let handle = metrics::install_prometheus_recorder()?;
        metrics::describe_metrics();
        Some(handle)
    } else {
        None
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.log_format == "json" {
        // Flatten event fields so `message` is top-level in each record
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true);
        registry
            .with(fmt_layer)
            .try_init()
            .context("Failed to install tracing subscriber")?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .context("Failed to install tracing subscriber")?;
    }

    tracing::info!(
        service = %config.service_name,
        log_format = %config.log_format,
        metrics = config.metrics_enabled,
        "Telemetry initialised"
    );

    Ok(prometheus_handle)
}
