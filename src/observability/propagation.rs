//! W3C Trace Context header carriers.
//!
//! `traceparent`: `{version}-{trace_id}-{span_id}-{trace_flags}`
//! `tracestate`: comma-separated vendor key-value pairs

use axum::http::header::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::propagation::{Extractor, Injector};

/// Name of the W3C parent header.
pub const TRACEPARENT: &str = "traceparent";

/// Read-only view of request headers for OTel extraction.
pub struct HeaderExtractor<'a>(pub &'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    /// Returns `None` if the header is missing or not UTF-8.
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key)?.to_str().ok()
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Mutable header map for OTel injection.
pub struct HeaderInjector<'a>(pub &'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    /// Silently ignores invalid header names or values.
    fn set(&mut self, key: &str, value: String) {
        if let Ok(name) = HeaderName::from_bytes(key.as_bytes()) {
            if let Ok(val) = HeaderValue::from_str(&value) {
                self.0.insert(name, val);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extractor_skips_non_utf8() {
        let mut headers = HeaderMap::new();
        headers.insert(TRACEPARENT, HeaderValue::from_static("00-abc"));
        headers.insert("x-binary", HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap());

        let extractor = HeaderExtractor(&headers);
        assert_eq!(extractor.get(TRACEPARENT), Some("00-abc"));
        assert_eq!(extractor.get("x-binary"), None);
        assert_eq!(extractor.keys().len(), 2);
    }

    #[test]
    fn injector_drops_invalid_values() {
        let mut headers = HeaderMap::new();
        let mut injector = HeaderInjector(&mut headers);
        injector.set("tracestate", "vendor=1".to_string());
        injector.set("bad header", "x".to_string());
        injector.set("x-bad-value", "line\nbreak".to_string());

        assert_eq!(headers.len(), 1);
        assert_eq!(headers["tracestate"], "vendor=1");
    }
}
