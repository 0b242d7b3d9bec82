//! OpenTelemetry-backed tracing provider.
//!
//! Client spans are `SpanKind::Client`, named `"{METHOD} {url}"`, tagged with
//! `http.method` and `http.url`, and closed with `http.status_code` or an
//! error status. Context travels as W3C `traceparent`/`tracestate`.
//!
//! No exporter is installed here; wiring spans to a collector is left to the
//! process embedding the gateway (pass a configured `TracerProvider`).

use axum::http::{HeaderMap, Method};
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::{SpanKind, Status, TraceContextExt, Tracer, TracerProvider as _};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{Tracer as SdkTracer, TracerProvider};

use crate::observability::propagation::{HeaderExtractor, HeaderInjector, TRACEPARENT};
use crate::observability::tracing::{ClientSpanStart, SpanHandle, SpanOutcome, TracingProvider};

const INSTRUMENTATION_NAME: &str = "service-gateway";

/// Tracing provider built on the OpenTelemetry SDK.
pub struct OtelTracing {
    // Keeps the SDK pipeline alive; tracers only hold a weak reference.
    _provider: TracerProvider,
    tracer: SdkTracer,
    propagator: TraceContextPropagator,
}

impl OtelTracing {
    /// Provider with a bare SDK pipeline (spans are created and propagated, not exported).
    pub fn new() -> Self {
        Self::with_provider(TracerProvider::builder().build())
    }

    /// Use an already configured SDK provider (exporters, samplers, resource).
    pub fn with_provider(provider: TracerProvider) -> Self {
        let tracer = provider.tracer(INSTRUMENTATION_NAME);
        Self {
            _provider: provider,
            tracer,
            propagator: TraceContextPropagator::new(),
        }
    }
}

impl Default for OtelTracing {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingProvider for OtelTracing {
    fn extract_context(&self, headers: &HeaderMap) -> Option<Context> {
        if !headers.contains_key(TRACEPARENT) {
            return None;
        }

        let cx = self.propagator.extract(&HeaderExtractor(headers));
        if cx.span().span_context().is_valid() {
            Some(cx)
        } else {
            tracing::debug!(
                traceparent = ?headers.get(TRACEPARENT),
                "Malformed inbound trace context, starting root span"
            );
            None
        }
    }

    fn start_span_client(
        &self,
        url: &str,
        method: &Method,
        parent: Option<&Context>,
    ) -> ClientSpanStart {
        let parent_cx = parent.cloned().unwrap_or_default();

        let span = self
            .tracer
            .span_builder(format!("{method} {url}"))
            .with_kind(SpanKind::Client)
            .with_attributes(vec![
                KeyValue::new("http.method", method.to_string()),
                KeyValue::new("http.url", url.to_string()),
            ])
            .start_with_context(&self.tracer, &parent_cx);

        let cx = parent_cx.with_span(span);

        let mut telemetry_headers = HeaderMap::new();
        self.propagator
            .inject_context(&cx, &mut HeaderInjector(&mut telemetry_headers));

        ClientSpanStart {
            span: Some(SpanHandle::new(cx)),
            telemetry_headers,
        }
    }

    fn end_span_client(&self, span: SpanHandle, outcome: &SpanOutcome) {
        let span_ref = span.context().span();

        match outcome {
            SpanOutcome::Status(code) => {
                span_ref.set_attribute(KeyValue::new("http.status_code", i64::from(*code)));
                if *code >= 500 {
                    span_ref.set_status(Status::error(format!("upstream returned {code}")));
                }
            }
            SpanOutcome::Failed(reason) => {
                span_ref.set_attribute(KeyValue::new("error.type", reason.clone()));
                span_ref.set_status(Status::error(reason.clone()));
            }
            SpanOutcome::Canceled => {
                span_ref.set_attribute(KeyValue::new("gateway.canceled", true));
                span_ref.set_status(Status::error("client disconnected"));
            }
        }

        span_ref.end();
    }
}
