//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (Axum)
//!     → server.rs (request ID, trace layer, catch-all handler)
//!     → routing (longest prefix match)
//!     → forwarding (headers, dispatch, response relay)
//!     → websocket.rs (tunnel after a 101)
//!     → response.rs (gateway-generated responses only)
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use request::{GatewayRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
