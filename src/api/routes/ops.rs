//! Manual trigger handlers: feed checks, digest sends, digest history.

use super::{DigestLogQuery, DigestLogResponse};
use crate::api::AppState;
use crate::types::{CycleReport, DigestReport};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

/// POST /ops/check-feeds - Check all enabled feeds and annotate new episodes
///
/// Runs one full cycle: fetch every enabled feed, diff against seen episodes,
/// then run the annotation pipeline over everything discovered. The cycle is
/// strictly sequential; a second call while one is running returns 409.
#[utoipa::path(
    post,
    path = "/api/v1/ops/check-feeds",
    tag = "ops",
    responses(
        (status = 200, description = "Cycle report", body = CycleReport),
        (status = 409, description = "A cycle is already in progress"),
        (status = 503, description = "Service is shutting down"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn check_feeds(State(state): State<AppState>) -> impl IntoResponse {
    match state.service.check_all_feeds_now().await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e @ crate::Error::CycleInProgress) => e.into_response(),
        Err(e @ crate::Error::ShuttingDown) => e.into_response(),
        Err(e) => {
            tracing::error!("Manual feed check failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": {"code": "check_failed", "message": format!("Feed check failed: {}", e)}}))).into_response()
        }
    }
}

/// POST /ops/digest - Assemble and send a digest now
///
/// Covers the window since the previous successful send. An empty window
/// still succeeds with `sent: false` and no mail handed to the relay.
#[utoipa::path(
    post,
    path = "/api/v1/ops/digest",
    tag = "ops",
    responses(
        (status = 200, description = "Digest report", body = DigestReport),
        (status = 502, description = "Mail relay rejected the digest"),
        (status = 503, description = "Service is shutting down"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn send_digest(State(state): State<AppState>) -> impl IntoResponse {
    match state.service.send_digest_now().await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e @ crate::Error::ShuttingDown) => e.into_response(),
        Err(e @ crate::Error::Digest(_)) => e.into_response(),
        Err(e) => {
            tracing::error!("Manual digest send failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": {"code": "digest_failed", "message": format!("Digest send failed: {}", e)}}))).into_response()
        }
    }
}

/// GET /digest/log - Digest send history, newest first
#[utoipa::path(
    get,
    path = "/api/v1/digest/log",
    tag = "ops",
    params(
        ("limit" = Option<i64>, Query, description = "Maximum number of entries to return (default: 50)")
    ),
    responses(
        (status = 200, description = "Digest send history", body = Vec<DigestLogResponse>),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn digest_log(
    State(state): State<AppState>,
    Query(query): Query<DigestLogQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(50);

    match state.service.db.get_digest_log(limit).await {
        Ok(rows) => {
            let entries: Vec<DigestLogResponse> =
                rows.into_iter().map(DigestLogResponse::from).collect();
            (StatusCode::OK, Json(entries)).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to get digest log: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": {"code": "database_error", "message": format!("Failed to get digest log: {}", e)}}))).into_response()
        }
    }
}
