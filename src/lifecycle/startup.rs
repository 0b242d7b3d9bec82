//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging and the metrics exporter
//! - Register routes (fatal on collision)
//! - Bind the listener and serve until a shutdown signal
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;
use std::path::Path;

use tokio::net::TcpListener;

use crate::config::load_config;
use crate::error::GatewayError;
use crate::http::HttpServer;
use crate::lifecycle::signals::wait_for_shutdown_signal;
use crate::lifecycle::Shutdown;
use crate::observability::logging::init_logging;
use crate::observability::metrics::init_metrics;

/// Start the gateway from the config file at `config_path`.
///
/// With `check_only`, stop after configuration and route registration succeed.
pub async fn bootstrap(config_path: &Path, check_only: bool) -> Result<(), GatewayError> {
    let config = load_config(config_path)?;

    init_logging(&config.observability)
        .map_err(|e| GatewayError::Startup(format!("logging: {e}")))?;

    tracing::info!(
        path = %config_path.display(),
        services = config.services.len(),
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        tracing_enabled = config.telemetry.tracing_enabled,
        "Configuration loaded"
    );

    let bind_address = config.listener.bind_address.clone();
    let metrics = config
        .observability
        .metrics_enabled
        .then(|| config.observability.metrics_address.clone());

    let server = HttpServer::new(config)?;

    if check_only {
        tracing::info!(routes = server.routes().len(), "Configuration check passed");
        return Ok(());
    }

    if let Some(address) = metrics {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| GatewayError::Startup(format!("metrics address {address}: {e}")))?;
        init_metrics(addr).map_err(|e| GatewayError::Startup(format!("metrics: {e}")))?;
    }

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let signals = tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        shutdown.trigger();
    });

    let result = server.run(listener, server_shutdown).await;
    signals.abort();

    tracing::info!("Shutdown complete");
    result
}
