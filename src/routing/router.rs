//! Route registration and lookup.
//!
//! # Responsibilities
//! - Turn service configurations into forwarding routes
//! - Reject empty, malformed or colliding prefixes as a whole batch
//! - Look up the route serving a request path
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) path prefix scan (acceptable for typical route counts)
//! - Longest matching prefix wins; registration order is kept for listing
//! - Explicit NoMatch rather than silent default

use std::collections::HashMap;
use std::sync::Arc;

use url::Url;

use crate::config::{parse_origin, ConfigError, ServiceConfig};
use crate::routing::matcher::{normalize_prefix, PathPrefixMatcher};

/// A registered forwarding rule: everything under `path_prefix` goes to `origin`.
#[derive(Debug, Clone)]
pub struct ServiceRoute {
    service_id: String,
    matcher: PathPrefixMatcher,
    origin: Url,
    origin_base: String,
    authority: String,
}

impl ServiceRoute {
    fn new(service_id: String, prefix: String, origin: Url) -> Self {
        let origin_base = origin.as_str().trim_end_matches('/').to_string();
        let host = origin.host_str().unwrap_or_default();
        let authority = match origin.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Self {
            service_id,
            matcher: PathPrefixMatcher::new(prefix),
            origin,
            origin_base,
            authority,
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Normalized prefix (no trailing slash, never empty).
    pub fn path_prefix(&self) -> &str {
        self.matcher.prefix()
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// `host[:port]` of the origin, sent as the outbound `Host` header.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// `origin + path_and_query`, the URL the request is forwarded to.
    pub fn target_url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.origin_base, path_and_query)
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matcher.matches(path)
    }
}

/// Immutable set of registered routes.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Arc<ServiceRoute>>,
}

impl RouteTable {
    /// Routes in registration order.
    pub fn routes(&self) -> &[Arc<ServiceRoute>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the route serving `path`, preferring the longest prefix.
    pub fn match_path(&self, path: &str) -> Option<Arc<ServiceRoute>> {
        self.routes
            .iter()
            .filter(|route| route.matches(path))
            .max_by_key(|route| route.path_prefix().len())
            .cloned()
    }
}

/// Build routes for every service with an enabled proxy descriptor.
///
/// Fails the whole batch on the first invalid prefix or origin and on any
/// collision between normalized prefixes; nothing is registered in that case.
pub fn register_routes(services: &[ServiceConfig]) -> Result<RouteTable, ConfigError> {
    let mut routes = Vec::new();
    let mut seen: HashMap<String, String> = HashMap::new();

    for (i, service) in services.iter().enumerate() {
        let Some(proxy) = service.proxy.as_ref().filter(|p| p.enabled) else {
            continue;
        };

        let prefix = normalize_prefix(&proxy.prefix);
        if prefix.is_empty() {
            return Err(ConfigError::Route(format!(
                "services[{i}]: prefix '{}' is empty after normalization",
                proxy.prefix
            )));
        }
        if !prefix.starts_with('/') {
            return Err(ConfigError::Route(format!(
                "services[{i}]: prefix '{}' must start with '/'",
                proxy.prefix
            )));
        }

        let origin = parse_origin(&service.origin)
            .map_err(|e| ConfigError::Route(format!("services[{i}]: {e}")))?;

        if let Some(previous) = seen.insert(prefix.to_string(), proxy.prefix.clone()) {
            return Err(ConfigError::Route(format!(
                "services[{i}]: prefix '{}' collides with '{}'",
                proxy.prefix, previous
            )));
        }

        let service_id = service.id.clone().unwrap_or_else(|| prefix.to_string());
        routes.push(ServiceRoute::new(service_id, prefix.to_string(), origin));
    }

    for route in &routes {
        tracing::info!(
            prefix = %route.path_prefix(),
            origin = %route.origin_base,
            "Proxying {} to {}",
            route.path_prefix(),
            route.origin_base
        );
    }

    Ok(RouteTable {
        routes: routes.into_iter().map(Arc::new).collect(),
    })
}
