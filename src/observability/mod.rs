//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!     → tracing.rs (client spans via a TracingProvider)
//!
//! Tracing providers:
//!     → NoopTracing (tracing disabled)
//!     → otel.rs (OpenTelemetry SDK + propagation.rs W3C carriers)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through all subsystems
//! - Metrics are cheap (atomic increments)
//! - Tracing is optional; the provider is injected, never looked up globally

pub mod logging;
pub mod metrics;
pub mod otel;
pub mod propagation;
pub mod tracing;

pub use self::otel::OtelTracing;
pub use self::tracing::{ClientSpanStart, NoopTracing, SpanHandle, SpanOutcome, TracingProvider};
