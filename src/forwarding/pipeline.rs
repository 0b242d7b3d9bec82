//! Header and trace pipeline.
//!
//! # Responsibilities
//! - Compute the outbound header set for a forwarded request
//! - Open one client span per forwarded request and close it exactly once
//! - Pass the backend response through once its span is closed
//!
//! # Header rules
//! ```text
//! inbound headers
//!     - hop-by-hop headers (connection/upgrade kept for upgrade requests)
//!     + host              = origin authority
//!     + trace propagation fields from the provider
//!     + x-forwarded-for   = client IP
//!     + x-forwarded-host  = host requested by the client
//!     + x-telemetry-id    = service identity (only when configured)
//! ```
//!
//! # Design Decisions
//! - The client span travels with the request as a `ClientSpan` guard; no
//!   shared map links requests to spans
//! - Dropping an unclosed guard closes the span as canceled, so a dropped
//!   handler future (client disconnect) cannot leak a span
//! - The outbound span is separate from whatever traces the inbound request

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::request::Parts;
use axum::http::Response;

use crate::config::{ConfigError, TelemetryConfig, ValidationError};
use crate::error::GatewayError;
use crate::forwarding::context::ForwardingContext;
use crate::http::request::client_host;
use crate::http::websocket::is_upgrade_request;
use crate::observability::metrics;
use crate::observability::{SpanHandle, SpanOutcome, TracingProvider};
use crate::routing::ServiceRoute;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_TELEMETRY_ID: HeaderName = HeaderName::from_static("x-telemetry-id");

/// Connection-scoped headers never relayed across the proxy hop.
const HOP_BY_HOP: [&str; 7] = [
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "te",
    "trailer",
    "trailers",
    "transfer-encoding",
];

/// Remove hop-by-hop headers, including any named in `Connection`.
///
/// With `preserve_upgrade`, `connection` and `upgrade` survive so the
/// backend sees the handshake.
pub fn strip_hop_by_hop(headers: &mut HeaderMap, preserve_upgrade: bool) {
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty() && token != "upgrade")
        .collect();

    for name in listed.iter().map(String::as_str).chain(HOP_BY_HOP) {
        headers.remove(name);
    }

    if !preserve_upgrade {
        headers.remove(header::CONNECTION);
        headers.remove(header::UPGRADE);
    }
}

/// Request-scoped handle to the client span of one forwarded call.
pub struct ClientSpan {
    tracing: Arc<dyn TracingProvider>,
    handle: Option<SpanHandle>,
}

impl ClientSpan {
    fn new(tracing: Arc<dyn TracingProvider>, handle: Option<SpanHandle>) -> Self {
        if handle.is_some() {
            metrics::client_span_opened();
        }
        Self { tracing, handle }
    }

    /// Whether a span was actually started (false with tracing disabled).
    pub fn is_recording(&self) -> bool {
        self.handle.is_some()
    }

    /// End the span with `outcome`.
    pub fn close(mut self, outcome: SpanOutcome) {
        self.finish(&outcome);
    }

    fn finish(&mut self, outcome: &SpanOutcome) {
        if let Some(handle) = self.handle.take() {
            self.tracing.end_span_client(handle, outcome);
            metrics::client_span_closed();
        }
    }
}

impl Drop for ClientSpan {
    fn drop(&mut self) {
        if self.handle.is_some() {
            tracing::debug!("Forward abandoned before completion, closing client span as canceled");
            self.finish(&SpanOutcome::Canceled);
        }
    }
}

impl std::fmt::Debug for ClientSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSpan")
            .field("recording", &self.is_recording())
            .finish()
    }
}

/// Outbound header computation and span bookkeeping shared by all routes.
pub struct HeaderPipeline {
    tracing: Arc<dyn TracingProvider>,
    telemetry_id: Option<HeaderValue>,
}

impl HeaderPipeline {
    pub fn new(
        tracing: Arc<dyn TracingProvider>,
        telemetry: &TelemetryConfig,
    ) -> Result<Self, GatewayError> {
        let telemetry_id = match &telemetry.service_name {
            Some(name) => Some(HeaderValue::from_str(name).map_err(|_| {
                ConfigError::Validation(vec![ValidationError::new(
                    "telemetry.service_name",
                    "must be a non-empty, header-safe string",
                )])
            })?),
            None => None,
        };

        Ok(Self {
            tracing,
            telemetry_id,
        })
    }

    /// Build the forwarding context for a request matched to `route`.
    pub fn forwarding_context(
        &self,
        route: Arc<ServiceRoute>,
        parts: &Parts,
        client_addr: SocketAddr,
    ) -> ForwardingContext {
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        ForwardingContext {
            target_url: route.target_url(path_and_query),
            method: parts.method.clone(),
            client_ip: client_addr.ip(),
            client_host: client_host(parts),
            inbound_trace: self.tracing.extract_context(&parts.headers),
            telemetry_id: self.telemetry_id.clone(),
            upgrade: is_upgrade_request(&parts.headers),
            route,
        }
    }

    /// Compute outbound headers and open the client span for this call.
    pub fn on_outbound_headers(
        &self,
        ctx: &ForwardingContext,
        inbound: &HeaderMap,
    ) -> (HeaderMap, ClientSpan) {
        let start = self.tracing.start_span_client(
            &ctx.target_url,
            &ctx.method,
            ctx.inbound_trace.as_ref(),
        );
        let span = ClientSpan::new(Arc::clone(&self.tracing), start.span);

        let mut headers = inbound.clone();
        strip_hop_by_hop(&mut headers, ctx.upgrade);

        if let Ok(host) = HeaderValue::from_str(ctx.route.authority()) {
            headers.insert(header::HOST, host);
        }

        for (name, value) in &start.telemetry_headers {
            headers.insert(name.clone(), value.clone());
        }

        if let Ok(ip) = HeaderValue::from_str(&ctx.client_ip.to_string()) {
            headers.insert(X_FORWARDED_FOR, ip);
        }

        match &ctx.client_host {
            Some(host) => {
                headers.insert(X_FORWARDED_HOST, host.clone());
            }
            None => {
                headers.remove(X_FORWARDED_HOST);
            }
        }

        match &ctx.telemetry_id {
            Some(id) => {
                headers.insert(X_TELEMETRY_ID, id.clone());
            }
            None => {
                headers.remove(X_TELEMETRY_ID);
            }
        }

        (headers, span)
    }

    /// Close the span with the backend status, then hand the response back untouched.
    pub fn on_inbound_response<B>(&self, span: ClientSpan, response: Response<B>) -> Response<B> {
        span.close(SpanOutcome::Status(response.status().as_u16()));
        response
    }

    /// Close the span of a forward that produced no usable response.
    pub fn on_failure(&self, span: ClientSpan, err: &GatewayError) {
        let outcome = match err {
            GatewayError::ClientDisconnected { .. } => SpanOutcome::Canceled,
            other => SpanOutcome::Failed(other.kind().to_string()),
        };
        span.close(outcome);
    }
}
