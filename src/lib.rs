//! Service gateway library.
//!
//! Registers path-prefix routes for the services that opt in, forwards
//! matching requests to each service's origin over one shared HTTP client,
//! and continues the caller's trace with a client span per forwarded request.

// Core subsystems
pub mod config;
pub mod error;
pub mod forwarding;
pub mod http;
pub mod net;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{register_routes, RouteTable, ServiceRoute};
