//! Prometheus metrics setup and metric definitions

use anyhow::Context;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> anyhow::Result<PrometheusHandle> {
    // Upstream calls dominate latency; buckets reach past the default deadline
    let buckets = [
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(&buckets)
        .context("failed to set histogram buckets")?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Register metric descriptions so HELP/TYPE lines appear from startup.
pub fn describe_metrics() {
    describe_counter!("estate_http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "estate_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_gauge!(
        "estate_http_requests_in_flight",
        "Number of HTTP requests currently being processed"
    );

    describe_counter!(
        "estate_upstream_requests_total",
        "Upstream calls by method and final outcome"
    );
    describe_counter!(
        "estate_upstream_retries_total",
        "Upstream retries issued for idempotent calls"
    );

    describe_counter!(
        "estate_auth_signin_total",
        "Sign-in callbacks by outcome"
    );
}
