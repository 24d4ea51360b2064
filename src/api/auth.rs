//! API key middleware.
//!
//! When [`ApiConfig::api_key`](crate::config::ApiConfig) is set, every request
//! must present the key, either as `X-Api-Key: <key>` or as
//! `Authorization: Bearer <key>`. The bearer form matches what the outbound
//! collaborator clients send, so one credential convention covers both
//! directions. Failures get the standard [`ApiError`] envelope.

use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

/// Reject requests that do not carry the configured API key.
///
/// A `None` state disables the check entirely; the router only installs this
/// layer when a key is configured, but the passthrough keeps the middleware
/// safe to mount unconditionally.
pub async fn require_api_key(
    State(expected): State<Option<String>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = expected else {
        return next.run(request).await;
    };

    match presented_key(&request) {
        Some(key) if keys_match(key.as_bytes(), expected.as_bytes()) => next.run(request).await,
        Some(_) => reject("Invalid API key"),
        None => reject("Missing API key: send X-Api-Key or an Authorization bearer token"),
    }
}

/// Pull the credential out of the request, X-Api-Key first.
fn presented_key(request: &Request) -> Option<&str> {
    let headers = request.headers();
    if let Some(value) = headers.get("x-api-key") {
        return value.to_str().ok();
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Compare keys while examining every byte, so the rejection time does not
/// leak the position of the first mismatch.
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

fn reject(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiError::unauthorized(message)),
    )
        .into_response()
}
