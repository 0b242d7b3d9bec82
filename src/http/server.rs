//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all gateway handler
//! - Wire up middleware (request ID, tracing)
//! - Match each request against the route table
//! - Hand matched requests to the transport adapter
//! - Record per-request metrics and logs
//! - Drain upgraded tunnels on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::forwarding::{Dispatcher, HeaderPipeline, TransportAdapter};
use crate::http::request::{request_id, GatewayRequestId};
use crate::http::response::no_route;
use crate::observability::metrics;
use crate::observability::{NoopTracing, OtelTracing, TracingProvider};
use crate::routing::{register_routes, RouteTable};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub adapter: Arc<TransportAdapter>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    routes: Arc<RouteTable>,
    adapter: Arc<TransportAdapter>,
}

impl HttpServer {
    /// Build the server, using OpenTelemetry when `telemetry.tracing_enabled` is set.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let tracing: Arc<dyn TracingProvider> = if config.telemetry.tracing_enabled {
            Arc::new(OtelTracing::new())
        } else {
            Arc::new(NoopTracing)
        };
        Self::with_tracing(config, tracing)
    }

    /// Build the server around an explicit tracing capability.
    ///
    /// Fails if any two enabled services share a prefix or a descriptor is
    /// invalid; no route is registered in that case.
    pub fn with_tracing(
        config: GatewayConfig,
        tracing: Arc<dyn TracingProvider>,
    ) -> Result<Self, GatewayError> {
        let routes = Arc::new(register_routes(&config.services)?);
        if routes.is_empty() {
            tracing::warn!("No services expose a proxy descriptor; every request will 404");
        }

        let pipeline = Arc::new(HeaderPipeline::new(tracing, &config.telemetry)?);
        let dispatcher = Arc::new(Dispatcher::new(&config.timeouts, &config.dispatcher));
        let adapter = Arc::new(TransportAdapter::new(
            dispatcher,
            pipeline,
            Duration::from_secs(config.timeouts.request_secs),
        ));

        let state = AppState {
            routes: Arc::clone(&routes),
            adapter: Arc::clone(&adapter),
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            routes,
            adapter,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(GatewayRequestId))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server until `shutdown` fires, then drain upgraded tunnels.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), GatewayError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.routes.len(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, no longer accepting connections");
            })
            .await?;

        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        self.adapter.drain_tunnels(grace).await;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Routes registered at construction.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }
}

/// Catch-all handler: match, forward, record.
async fn gateway_handler(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let request_id = request_id(request.headers()).to_string();

    let Some(route) = state.routes.match_path(&path) else {
        tracing::debug!(request_id = %request_id, method = %method, path = %path, "No route matched");
        metrics::record_request("none", &method, 404, start);
        return no_route();
    };

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        route = %route.service_id(),
        "Forwarding request"
    );

    match state
        .adapter
        .forward(Arc::clone(&route), request, client_addr)
        .await
    {
        Ok(response) => {
            metrics::record_request(
                route.service_id(),
                &method,
                response.status().as_u16(),
                start,
            );
            response
        }
        Err(err) => {
            tracing::warn!(
                request_id = %request_id,
                route = %route.service_id(),
                error = %err,
                "Forwarding failed"
            );
            metrics::record_upstream_error(route.service_id(), err.kind());
            metrics::record_request(route.service_id(), &method, err.status_code().as_u16(), start);
            err.into_response()
        }
    }
}
