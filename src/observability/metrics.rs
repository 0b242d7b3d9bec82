//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, method, status
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_upstream_errors_total` (counter): failed forwards by route, kind
//! - `gateway_client_spans_open` (gauge): client spans started and not yet ended
//! - `gateway_tunnels_active` (gauge): upgraded connections being relayed
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Prometheus exporter is optional and owns its own listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and start its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a completed forward (or a request that matched no route).
pub fn record_request(route: &str, method: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    ::metrics::histogram!(
        "gateway_request_duration_seconds",
        "route" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_error(route: &str, kind: &'static str) {
    ::metrics::counter!(
        "gateway_upstream_errors_total",
        "route" => route.to_string(),
        "kind" => kind
    )
    .increment(1);
}

pub fn client_span_opened() {
    ::metrics::gauge!("gateway_client_spans_open").increment(1.0);
}

pub fn client_span_closed() {
    ::metrics::gauge!("gateway_client_spans_open").decrement(1.0);
}

pub fn tunnel_opened() {
    ::metrics::gauge!("gateway_tunnels_active").increment(1.0);
}

pub fn tunnel_closed() {
    ::metrics::gauge!("gateway_tunnels_active").decrement(1.0);
}
