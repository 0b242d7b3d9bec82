//! Distributed tracing provider contract.
//!
//! # Responsibilities
//! - Extract trace context from incoming requests
//! - Start a client span for each outbound call and hand back propagation headers
//! - End that span with the observed outcome
//!
//! # Design Decisions
//! - Tracing is a capability: a disabled gateway uses `NoopTracing`, not `if`s
//! - Span handles are opaque `Context`s so providers can store whatever they need
//! - Providers never fail; a broken parent context degrades to a root span

use std::fmt;

use axum::http::{HeaderMap, Method};
use opentelemetry::Context;

/// How a client span ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanOutcome {
    /// The backend answered (including `101 Switching Protocols`).
    Status(u16),
    /// The outbound call failed; carries a short reason such as `upstream_timeout`.
    Failed(String),
    /// The original client went away before the backend answered.
    Canceled,
}

impl fmt::Display for SpanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpanOutcome::Status(code) => write!(f, "status {code}"),
            SpanOutcome::Failed(reason) => write!(f, "failed ({reason})"),
            SpanOutcome::Canceled => f.write_str("canceled"),
        }
    }
}

/// Opaque handle to a started client span.
#[derive(Debug, Clone)]
pub struct SpanHandle {
    context: Context,
}

impl SpanHandle {
    pub fn new(context: Context) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }
}

/// Result of `start_span_client`.
#[derive(Debug, Default)]
pub struct ClientSpanStart {
    /// `None` when the provider does not trace.
    pub span: Option<SpanHandle>,
    /// Header fields to inject into the outbound request.
    pub telemetry_headers: HeaderMap,
}

/// Tracing collaborator used by the forwarding pipeline.
pub trait TracingProvider: Send + Sync + 'static {
    /// Parent context carried by the inbound request, if any and well-formed.
    fn extract_context(&self, headers: &HeaderMap) -> Option<Context>;

    /// Start a client span for `method url`, child of `parent` when given.
    fn start_span_client(&self, url: &str, method: &Method, parent: Option<&Context>)
        -> ClientSpanStart;

    /// End a span previously returned by `start_span_client`.
    fn end_span_client(&self, span: SpanHandle, outcome: &SpanOutcome);
}

/// Provider used when tracing is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracing;

impl TracingProvider for NoopTracing {
    fn extract_context(&self, _headers: &HeaderMap) -> Option<Context> {
        None
    }

    fn start_span_client(
        &self,
        _url: &str,
        _method: &Method,
        _parent: Option<&Context>,
    ) -> ClientSpanStart {
        ClientSpanStart::default()
    }

    fn end_span_client(&self, _span: SpanHandle, _outcome: &SpanOutcome) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_provider_starts_nothing() {
        let provider = NoopTracing;
        let mut headers = HeaderMap::new();
        headers.insert(
            "traceparent",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01".parse().unwrap(),
        );

        assert!(provider.extract_context(&headers).is_none());
        let start = provider.start_span_client("http://backend/x", &Method::GET, None);
        assert!(start.span.is_none());
        assert!(start.telemetry_headers.is_empty());
    }

    #[test]
    fn outcome_display() {
        assert_eq!(SpanOutcome::Status(200).to_string(), "status 200");
        assert_eq!(SpanOutcome::Failed("upstream_timeout".into()).to_string(), "failed (upstream_timeout)");
        assert_eq!(SpanOutcome::Canceled.to_string(), "canceled");
    }
}
