//! Per-request forwarding state.

use std::net::IpAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use opentelemetry::Context;

use crate::routing::ServiceRoute;

/// Everything the pipeline needs to rewrite one request.
///
/// Built when a request matches a route, consumed by the header pipeline,
/// never stored beyond the request.
#[derive(Debug, Clone)]
pub struct ForwardingContext {
    pub route: Arc<ServiceRoute>,
    /// `origin + path_and_query`.
    pub target_url: String,
    pub method: Method,
    pub client_ip: IpAddr,
    /// Host the client asked for (`Host` header, or URI authority on HTTP/2).
    pub client_host: Option<HeaderValue>,
    /// Parent trace context carried by the inbound request.
    pub inbound_trace: Option<Context>,
    /// Process-wide service identity sent as `x-telemetry-id`.
    pub telemetry_id: Option<HeaderValue>,
    /// Inbound request asked for a protocol upgrade.
    pub upgrade: bool,
}
