//! Gateway-generated responses.
//!
//! Backend responses are streamed through unchanged apart from hop-by-hop
//! headers; only requests the gateway answers itself are built here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// 404 for a path no registered route covers.
pub fn no_route() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "no route matches path" })),
    )
        .into_response()
}
