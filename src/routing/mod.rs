//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Registration (at startup):
//!     ServiceConfig[]
//!     → skip services without an enabled proxy descriptor
//!     → normalize prefixes, validate origins, detect collisions
//!     → Freeze as immutable RouteTable
//!
//! Incoming Request (path)
//!     → router.rs (route lookup)
//!     → matcher.rs (segment-boundary prefix check)
//!     → Return: matched ServiceRoute or NoMatch
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - A bad route aborts the whole registration batch

pub mod matcher;
pub mod router;

pub use router::{register_routes, RouteTable, ServiceRoute};
