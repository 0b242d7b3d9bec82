//! Request forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Matched request (route + client address)
//!     → pipeline.rs (hop-by-hop strip, Host rewrite, x-forwarded-*, telemetry headers)
//!     → adapter.rs (state machine, deadline, upgrade handoff)
//!     → dispatcher.rs (shared pooled HTTP client)
//!     → Backend
//! ```
//!
//! # Design Decisions
//! - One dispatcher per process, shared by every route
//! - Header computation is separate from transport so it can be tested without sockets
//! - Exactly one client span per forwarded request, closed on every exit path

pub mod adapter;
pub mod context;
pub mod dispatcher;
pub mod pipeline;

pub use adapter::TransportAdapter;
pub use context::ForwardingContext;
pub use dispatcher::Dispatcher;
pub use pipeline::{strip_hop_by_hop, ClientSpan, HeaderPipeline, X_FORWARDED_FOR, X_FORWARDED_HOST, X_TELEMETRY_ID};
