//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status and route
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_config_reloads_total` (counter): reload checks by outcome
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed, so library code
//!   and tests record unconditionally
//! - The Prometheus endpoint is only bound when `server.metrics_address`
//!   is configured

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!(
        "proxy_requests_total",
        "Total proxied requests by method, status and route key"
    );
    describe_histogram!(
        "proxy_request_duration_seconds",
        "Time from request receipt to upstream response headers"
    );
    describe_counter!("proxy_config_reloads_total", "Config reload checks by outcome");

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a finished request.
///
/// `route` is the matched route key, or `none` for paths that matched no
/// configured route.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    let route = route.to_string();

    counter!(
        "proxy_requests_total",
        "method" => method.clone(),
        "status" => status.clone(),
        "route" => route.clone()
    )
    .increment(1);
    histogram!(
        "proxy_request_duration_seconds",
        "method" => method,
        "status" => status,
        "route" => route
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record a reload check that did something.
pub fn record_config_reload(outcome: &'static str) {
    counter!("proxy_config_reloads_total", "outcome" => outcome).increment(1);
}
