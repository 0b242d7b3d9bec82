//! WebSocket (protocol upgrade) passthrough.
//!
//! # Responsibilities
//! - Detect upgrade requests
//! - After the backend answers `101`, splice client and backend connections
//! - Close both sides on error or shutdown
//!
//! # Data Flow
//! ```text
//! Client ←──── raw bytes ────→ Gateway ←──── raw bytes ────→ Backend
//! ```
//!
//! # Design Decisions
//! - Byte-level tunnel: frames are never parsed, so any upgraded protocol works
//! - The tunnel runs in its own task, detached from the HTTP exchange
//! - A failed upgrade on either side drops both halves (connection closed)

use axum::http::{header, HeaderMap};
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use tokio::sync::broadcast;

use crate::error::GatewayError;
use crate::net::ConnectionGuard;
use crate::observability::metrics;

/// True when `Connection` carries the `upgrade` token and `Upgrade` is present.
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    let connection_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));

    connection_upgrade && headers.contains_key(header::UPGRADE)
}

/// Upgrade protocol requested by the client, lowercased.
pub fn upgrade_protocol(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase())
}

/// Both halves of an upgraded exchange, waiting to be spliced.
pub struct Tunnel {
    pub route: String,
    pub origin: String,
    pub client: OnUpgrade,
    pub upstream: OnUpgrade,
}

impl Tunnel {
    /// Relay bytes in both directions until either side closes or shutdown fires.
    pub async fn run(self, guard: ConnectionGuard, mut shutdown: broadcast::Receiver<()>) {
        let tunnel_id = guard.id();

        let (client, upstream) = match tokio::try_join!(self.client, self.upstream) {
            Ok(pair) => pair,
            Err(e) => {
                let err = GatewayError::UpgradeFailed {
                    origin: self.origin,
                    reason: e.to_string(),
                };
                metrics::record_upstream_error(&self.route, err.kind());
                tracing::warn!(tunnel_id = %tunnel_id, error = %err, "Tunnel torn down");
                return;
            }
        };

        let mut client = TokioIo::new(client);
        let mut upstream = TokioIo::new(upstream);

        metrics::tunnel_opened();
        tracing::debug!(tunnel_id = %tunnel_id, origin = %self.origin, "Tunnel established");

        tokio::select! {
            result = tokio::io::copy_bidirectional(&mut client, &mut upstream) => match result {
                Ok((from_client, from_upstream)) => tracing::debug!(
                    tunnel_id = %tunnel_id,
                    from_client,
                    from_upstream,
                    "Tunnel closed"
                ),
                Err(e) => tracing::debug!(tunnel_id = %tunnel_id, error = %e, "Tunnel closed with error"),
            },
            _ = shutdown.recv() => {
                tracing::debug!(tunnel_id = %tunnel_id, "Tunnel closed by shutdown");
            }
        }

        metrics::tunnel_closed();
    }
}
