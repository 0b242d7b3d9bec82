//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (enforce response-header deadline)
//!     → On failure: error surfaces to the client as 502/504
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every outbound call has a deadline
//! - No retries and no circuit breaking: a failed forward fails once, visibly

pub mod timeouts;
