//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, origins and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Prefix normalization and collisions belong to the route registrar

use std::fmt;
use std::net::SocketAddr;

use axum::http::HeaderValue;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g., `services[2].origin`).
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    let timeouts = [
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.pool_idle_secs", config.timeouts.pool_idle_secs),
    ];
    for (field, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if let Some(name) = &config.telemetry.service_name {
        if name.is_empty() || HeaderValue::from_str(name).is_err() {
            errors.push(ValidationError::new(
                "telemetry.service_name",
                "must be a non-empty, header-safe string",
            ));
        }
    }

    // Services without an enabled proxy descriptor are never routed.
    let proxied = config
        .services
        .iter()
        .enumerate()
        .filter(|(_, service)| service.proxy.as_ref().is_some_and(|p| p.enabled));
    for (i, service) in proxied {
        if let Err(message) = parse_origin(&service.origin) {
            errors.push(ValidationError::new(format!("services[{i}].origin"), message));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse a backend origin: an absolute `http` URL with a host and no query.
pub fn parse_origin(origin: &str) -> Result<Url, String> {
    let url = Url::parse(origin).map_err(|e| format!("'{origin}' is not a valid URL: {e}"))?;

    if url.scheme() != "http" {
        return Err(format!(
            "'{origin}' uses unsupported scheme '{}' (expected http)",
            url.scheme()
        ));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(format!("'{origin}' has no host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(format!("'{origin}' must not carry a query or fragment"));
    }

    Ok(url)
}
