//! Shared outbound dispatcher.
//!
//! # Responsibilities
//! - Own the single pooled HTTP client used by every route
//! - Apply connect timeout and pool sizing from configuration
//!
//! # Design Decisions
//! - Created once at startup, handed out as `Arc<Dispatcher>`
//! - Routes and requests only borrow it; nothing but process exit tears it down
//! - Connection reuse is internal to the client and safe for concurrent use

use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::{Client, ResponseFuture};
use hyper_util::rt::{TokioExecutor, TokioTimer};

use crate::config::{DispatcherConfig, TimeoutConfig};

/// Process-wide outbound HTTP client.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: Client<HttpConnector, Body>,
}

impl Dispatcher {
    pub fn new(timeouts: &TimeoutConfig, config: &DispatcherConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(timeouts.pool_idle_secs))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_timer(TokioTimer::new())
            .build(connector);

        tracing::debug!(
            connect_timeout_secs = timeouts.connect_secs,
            pool_idle_secs = timeouts.pool_idle_secs,
            pool_max_idle_per_host = config.pool_max_idle_per_host,
            "Outbound dispatcher created"
        );

        Self { client }
    }

    /// Issue a request over the shared pool.
    ///
    /// Dropping the returned future cancels the call.
    pub fn send(&self, request: Request<Body>) -> ResponseFuture {
        self.client.request(request)
    }
}
