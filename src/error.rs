//! Gateway error taxonomy.
//!
//! # Design Decisions
//! - Configuration errors are fatal at startup and never reach a client
//! - Per-request errors are confined to the request that produced them
//! - Client-facing bodies carry a generic message, never internal detail

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::config::ConfigError;

/// Non-standard status used in logs and metrics for requests the client abandoned.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Errors produced while building or running the gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Invalid, colliding or unloadable configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The backend refused or dropped the outbound connection.
    #[error("upstream {origin} unreachable: {reason}")]
    UpstreamUnreachable { origin: String, reason: String },

    /// The backend did not produce response headers before the deadline.
    #[error("upstream {origin} timed out after {secs}s")]
    UpstreamTimeout { origin: String, secs: u64 },

    /// The original client went away before the backend answered.
    #[error("client disconnected before upstream {origin} responded")]
    ClientDisconnected { origin: String },

    /// The backend upgrade handshake could not be completed.
    #[error("upgrade to {origin} failed: {reason}")]
    UpgradeFailed { origin: String, reason: String },

    /// A process-level subsystem (logging, metrics exporter) failed to start.
    #[error("startup failed: {0}")]
    Startup(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Status code reported to the client (or recorded, when nobody is listening).
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::UpstreamUnreachable { .. } | GatewayError::UpgradeFailed { .. } => {
                StatusCode::BAD_GATEWAY
            }
            GatewayError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::ClientDisconnected { .. } => {
                StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::BAD_REQUEST)
            }
            GatewayError::Config(_) | GatewayError::Startup(_) | GatewayError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short label for metrics and span outcomes.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Config(_) => "config",
            GatewayError::UpstreamUnreachable { .. } => "upstream_unreachable",
            GatewayError::UpstreamTimeout { .. } => "upstream_timeout",
            GatewayError::ClientDisconnected { .. } => "client_disconnected",
            GatewayError::UpgradeFailed { .. } => "upgrade_failed",
            GatewayError::Startup(_) => "startup",
            GatewayError::Io(_) => "io",
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            GatewayError::UpstreamUnreachable { .. } => "Upstream service unavailable",
            GatewayError::UpstreamTimeout { .. } => "Upstream service timed out",
            GatewayError::ClientDisconnected { .. } => "Client closed request",
            GatewayError::UpgradeFailed { .. } => "Upstream upgrade failed",
            GatewayError::Config(_) | GatewayError::Startup(_) | GatewayError::Io(_) => {
                "Internal gateway error"
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({ "error": self.public_message() });
        (status, Json(body)).into_response()
    }
}
