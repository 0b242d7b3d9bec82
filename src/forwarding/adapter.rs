//! Transport adapter: drives one forwarded request end to end.
//!
//! # State Machine
//! ```text
//! MATCHED → HEADERS_COMPUTED → OUTBOUND_SENT → RESPONSE_RECEIVED
//!                                            → UPGRADED
//!                                            → FAILED
//! ```
//!
//! # Design Decisions
//! - Every outbound call goes through the shared dispatcher
//! - The client span is closed before the response is handed back, on every path
//! - Upgrades relay the backend `101` and splice the connections in a detached task
//! - Client disconnect drops this future, which cancels the outbound call and
//!   closes the span through the `ClientSpan` guard

use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode, Uri};

use crate::error::GatewayError;
use crate::forwarding::dispatcher::Dispatcher;
use crate::forwarding::pipeline::{strip_hop_by_hop, HeaderPipeline};
use crate::http::websocket::{upgrade_protocol, Tunnel};
use crate::lifecycle::Shutdown;
use crate::net::ConnectionTracker;
use crate::resilience::timeouts::with_deadline;
use crate::routing::ServiceRoute;

/// Forwards matched requests to their route's origin.
pub struct TransportAdapter {
    dispatcher: Arc<Dispatcher>,
    pipeline: Arc<HeaderPipeline>,
    request_timeout: Duration,
    tunnels: ConnectionTracker,
    tunnel_shutdown: Shutdown,
}

impl TransportAdapter {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        pipeline: Arc<HeaderPipeline>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            dispatcher,
            pipeline,
            request_timeout,
            tunnels: ConnectionTracker::new(),
            tunnel_shutdown: Shutdown::new(),
        }
    }

    /// Forward `request` to `route`'s origin.
    pub async fn forward(
        &self,
        route: Arc<ServiceRoute>,
        mut request: Request<Body>,
        client_addr: SocketAddr,
    ) -> Result<Response<Body>, GatewayError> {
        let client_upgrade = hyper::upgrade::on(&mut request);
        let (parts, body) = request.into_parts();

        let ctx = self
            .pipeline
            .forwarding_context(Arc::clone(&route), &parts, client_addr);
        tracing::trace!(
            state = "MATCHED",
            route = %route.service_id(),
            target = %ctx.target_url,
            "Forwarding request"
        );

        let (headers, span) = self.pipeline.on_outbound_headers(&ctx, &parts.headers);
        tracing::trace!(state = "HEADERS_COMPUTED", recording = span.is_recording());

        let origin = route.origin().as_str().trim_end_matches('/').to_string();

        let uri: Uri = match ctx.target_url.parse() {
            Ok(uri) => uri,
            Err(e) => {
                let err = GatewayError::UpstreamUnreachable {
                    origin,
                    reason: format!("invalid target URI: {e}"),
                };
                self.pipeline.on_failure(span, &err);
                return Err(err);
            }
        };

        let mut outbound = Request::new(body);
        *outbound.method_mut() = parts.method.clone();
        *outbound.uri_mut() = uri;
        *outbound.headers_mut() = headers;

        tracing::trace!(state = "OUTBOUND_SENT", method = %parts.method);
        let sent = with_deadline(self.request_timeout, &origin, async {
            self.dispatcher
                .send(outbound)
                .await
                .map_err(|e| classify_error(e, &origin))
        })
        .await;

        let mut response = match sent {
            Ok(response) => response,
            Err(err) => {
                tracing::trace!(state = "FAILED", error = %err);
                self.pipeline.on_failure(span, &err);
                return Err(err);
            }
        };

        if ctx.upgrade && response.status() == StatusCode::SWITCHING_PROTOCOLS {
            let upstream_upgrade = hyper::upgrade::on(&mut response);
            let response = self.pipeline.on_inbound_response(span, response);
            tracing::debug!(
                state = "UPGRADED",
                route = %route.service_id(),
                protocol = ?upgrade_protocol(&parts.headers),
                "Upgrade accepted by backend"
            );

            let tunnel = Tunnel {
                route: route.service_id().to_string(),
                origin,
                client: client_upgrade,
                upstream: upstream_upgrade,
            };
            let guard = self.tunnels.track();
            let shutdown = self.tunnel_shutdown.subscribe();
            tokio::spawn(tunnel.run(guard, shutdown));

            let (head, _) = response.into_parts();
            return Ok(Response::from_parts(head, Body::empty()));
        }

        let response = self.pipeline.on_inbound_response(span, response);
        tracing::trace!(state = "RESPONSE_RECEIVED", status = %response.status());

        let (mut head, body) = response.into_parts();
        strip_hop_by_hop(&mut head.headers, false);
        Ok(Response::from_parts(head, Body::new(body)))
    }

    /// Wait up to `grace` for tunnels to finish, then close the rest.
    pub async fn drain_tunnels(&self, grace: Duration) {
        let active = self.tunnels.active_count();
        if active == 0 {
            return;
        }

        tracing::info!(active, grace_secs = grace.as_secs(), "Waiting for tunnels to drain");
        if !self.tunnels.wait_for_drain(grace).await {
            tracing::warn!(
                remaining = self.tunnels.active_count(),
                "Tunnels still open after grace period, closing"
            );
            self.tunnel_shutdown.trigger();
            self.tunnels.wait_for_drain(Duration::from_secs(1)).await;
        }
    }
}

/// Map a dispatcher error to the gateway taxonomy.
fn classify_error(err: hyper_util::client::legacy::Error, origin: &str) -> GatewayError {
    if caused_by_inbound_body(&err) {
        return GatewayError::ClientDisconnected {
            origin: origin.to_string(),
        };
    }

    let reason = if err.is_connect() {
        format!("connect: {}", error_chain(&err))
    } else {
        error_chain(&err)
    };

    GatewayError::UpstreamUnreachable {
        origin: origin.to_string(),
        reason,
    }
}

/// The request body stream (the client's upload) failed mid-flight.
fn caused_by_inbound_body(err: &(dyn StdError + 'static)) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if cause.downcast_ref::<axum::Error>().is_some() {
            return true;
        }
        source = cause.source();
    }
    false
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
