//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Upgraded connection (client ⇄ gateway ⇄ backend)
//!     → connection.rs (tunnel ID, active count guard)
//!     → shutdown waits for the count to reach zero, then forces close
//! ```
//!
//! # Design Decisions
//! - Listener and HTTP connections are owned by Axum; only tunnels are tracked here
//! - Each tunnel is tracked for graceful shutdown through an RAII guard

pub mod connection;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
