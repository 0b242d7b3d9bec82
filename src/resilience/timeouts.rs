//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound the wait for backend response headers
//! - Cancel the outbound call cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other upstream errors
//! - Timed-out requests return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use crate::error::GatewayError;

/// Run an upstream call under `deadline`; the inner future is dropped when it elapses.
pub async fn with_deadline<F, T>(deadline: Duration, origin: &str, call: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::UpstreamTimeout {
            origin: origin.to_string(),
            secs: deadline.as_secs(),
        }),
    }
}
