//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Backend services, in registration order.
    pub services: Vec<ServiceConfig>,

    /// Process-wide telemetry identity and tracing switch.
    pub telemetry: TelemetryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Shared outbound dispatcher settings.
    pub dispatcher: DispatcherConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// One backend service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Service identifier for logs and metrics. Falls back to the prefix.
    #[serde(default)]
    pub id: Option<String>,

    /// Absolute URL of the backend (e.g., "http://backend:9000").
    pub origin: String,

    /// Proxy descriptor. Services without one are not exposed.
    #[serde(default)]
    pub proxy: Option<ProxyDescriptor>,
}

/// How a service is exposed through the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyDescriptor {
    /// Path prefix; a single trailing slash is ignored.
    pub prefix: String,

    /// Disabled descriptors behave as if absent.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Telemetry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Sent to backends as `x-telemetry-id` when set.
    pub service_name: Option<String>,

    /// Open an OpenTelemetry client span per forwarded request.
    pub tracing_enabled: bool,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for the backend to produce response headers, in seconds.
    pub request_secs: u64,

    /// Idle pooled connection lifetime in seconds.
    pub pool_idle_secs: u64,

    /// How long shutdown waits for upgraded tunnels to drain, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
            pool_idle_secs: 90,
            shutdown_grace_secs: 10,
        }
    }
}

/// Shared outbound dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Idle connections kept per backend host.
    pub pool_max_idle_per_host: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: 32,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [[services]]
            origin = "http://backend:9000"
            proxy = { prefix = "/orders/" }
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.services.len(), 1);
        let proxy = config.services[0].proxy.as_ref().unwrap();
        assert_eq!(proxy.prefix, "/orders/");
        assert!(proxy.enabled);
        assert!(config.telemetry.service_name.is_none());
        assert!(!config.telemetry.tracing_enabled);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn service_without_proxy_parses() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [telemetry]
            service_name = "svc-a"

            [[services]]
            id = "internal"
            origin = "http://internal:7000"
            "#,
        )
        .unwrap();

        assert!(config.services[0].proxy.is_none());
        assert_eq!(config.telemetry.service_name.as_deref(), Some("svc-a"));
    }
}
