//! Prometheus metrics exposition
//!
//! - `proxy_requests_total` (counter): labels `route`, `status`
//! - `proxy_request_duration_seconds` (histogram): label `route`
//! - `proxy_upstream_errors_total` (counter): labels `upstream`, `error_type`
//! - `auth_token_exchanges_total` (counter): label `outcome`

use anyhow::Context;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Upstream call latencies are bounded by IAM and the broker, not by us;
/// buckets span 5ms to 60s.
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

fn builder() -> anyhow::Result<PrometheusBuilder> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("proxy_request_duration_seconds".to_string()),
            DURATION_BUCKETS,
        )
        .context("setting histogram buckets")
}

/// Install the global Prometheus recorder and return a handle for `/metrics`.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    builder()?
        .install_recorder()
        .context("installing Prometheus recorder")
}

/// Record a completed API request.
pub fn record_request(route: &'static str, status: u16, duration_secs: f64) {
    metrics::counter!("proxy_requests_total", "route" => route, "status" => status.to_string())
        .increment(1);
    metrics::histogram!("proxy_request_duration_seconds", "route" => route).record(duration_secs);
}

/// Record a failed call to IAM or the storage broker.
pub fn record_upstream_error(upstream: &'static str, error_type: &'static str) {
    metrics::counter!(
        "proxy_upstream_errors_total",
        "upstream" => upstream,
        "error_type" => error_type
    )
    .increment(1);
}

pub fn record_token_exchange(outcome: &'static str) {
    metrics::counter!("auth_token_exchanges_total", "outcome" => outcome).increment(1);
}

/// Label for a transport-level reqwest failure.
pub fn transport_error_type(err: &reqwest::Error) -> &'static str {
    if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connection"
    } else {
        "other"
    }
}
