//! Podcast feed management handlers.

use super::{AddPodcastRequest, PodcastResponse};
use crate::api::AppState;
use crate::db::UpdatePodcastParams;
use crate::types::{CycleReport, PodcastId};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

/// GET /podcasts - List podcast feeds
#[utoipa::path(
    get,
    path = "/api/v1/podcasts",
    tag = "podcasts",
    responses(
        (status = 200, description = "List of podcast feeds", body = Vec<PodcastResponse>),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_podcasts(State(state): State<AppState>) -> impl IntoResponse {
    match state.service.db.get_all_podcasts().await {
        Ok(rows) => {
            let podcasts: Vec<PodcastResponse> =
                rows.into_iter().map(PodcastResponse::from).collect();
            (StatusCode::OK, Json(podcasts)).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to get podcasts: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": {"code": "database_error", "message": format!("Failed to get podcasts: {}", e)}}))).into_response()
        }
    }
}

/// GET /podcasts/:id - Get a single podcast feed
#[utoipa::path(
    get,
    path = "/api/v1/podcasts/{id}",
    tag = "podcasts",
    params(("id" = i64, Path, description = "Podcast ID")),
    responses(
        (status = 200, description = "Podcast feed", body = PodcastResponse),
        (status = 404, description = "Podcast not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_podcast(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    match state.service.db.get_podcast(id).await {
        Ok(Some(row)) => (StatusCode::OK, Json(PodcastResponse::from(row))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"code": "not_found", "message": "Podcast not found"}})),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to get podcast: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": {"code": "database_error", "message": format!("Failed to get podcast: {}", e)}}))).into_response()
        }
    }
}

/// POST /podcasts - Add a podcast feed
#[utoipa::path(
    post,
    path = "/api/v1/podcasts",
    tag = "podcasts",
    request_body = AddPodcastRequest,
    responses(
        (status = 201, description = "Podcast feed added successfully", body = PodcastResponse),
        (status = 400, description = "Invalid podcast feed configuration"),
        (status = 409, description = "Feed URL already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn add_podcast(
    State(state): State<AppState>,
    Json(request): Json<AddPodcastRequest>,
) -> impl IntoResponse {
    if request.url.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(
                json!({"error": {"code": "invalid_input", "message": "Feed URL cannot be empty"}}),
            ),
        )
            .into_response();
    }

    // Validate URL scheme and host to prevent SSRF attacks
    if let Err(msg) = validate_feed_url(&request.url) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"code": "invalid_input", "message": msg}})),
        )
            .into_response();
    }

    // Reject duplicate feed URLs up front with a clear conflict response
    match state.service.db.get_podcast_by_url(&request.url).await {
        Ok(Some(_)) => {
            return (
                StatusCode::CONFLICT,
                Json(json!({"error": {"code": "conflict", "message": "Feed URL already registered"}})),
            )
                .into_response();
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!("Failed to check for existing podcast: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": {"code": "database_error", "message": format!("Failed to add podcast: {}", e)}}))).into_response();
        }
    }

    let check_interval_secs = request.check_interval_secs.unwrap_or(3600);
    let enabled = request.enabled.unwrap_or(true);

    match state
        .service
        .add_podcast(
            &request.url,
            request.title.as_deref(),
            check_interval_secs,
            enabled,
        )
        .await
    {
        Ok(row) => (StatusCode::CREATED, Json(PodcastResponse::from(row))).into_response(),
        Err(e) => {
            tracing::error!("Failed to add podcast: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": {"code": "database_error", "message": format!("Failed to add podcast: {}", e)}}))).into_response()
        }
    }
}

/// PUT /podcasts/:id - Update a podcast feed
#[utoipa::path(
    put,
    path = "/api/v1/podcasts/{id}",
    tag = "podcasts",
    params(("id" = i64, Path, description = "Podcast ID")),
    request_body = AddPodcastRequest,
    responses(
        (status = 204, description = "Podcast feed updated successfully"),
        (status = 400, description = "Invalid podcast feed configuration"),
        (status = 404, description = "Podcast not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_podcast(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<AddPodcastRequest>,
) -> impl IntoResponse {
    if request.url.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(
                json!({"error": {"code": "invalid_input", "message": "Feed URL cannot be empty"}}),
            ),
        )
            .into_response();
    }

    // Validate URL scheme and host to prevent SSRF attacks
    if let Err(msg) = validate_feed_url(&request.url) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"code": "invalid_input", "message": msg}})),
        )
            .into_response();
    }

    let title = request.title.as_deref().unwrap_or(&request.url);
    let params = UpdatePodcastParams {
        id,
        title,
        url: &request.url,
        check_interval_secs: request.check_interval_secs.unwrap_or(3600),
        enabled: request.enabled.unwrap_or(true),
    };

    match state.service.db.update_podcast(params).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"code": "not_found", "message": "Podcast not found"}})),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to update podcast: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": {"code": "database_error", "message": format!("Failed to update podcast: {}", e)}}))).into_response()
        }
    }
}

/// DELETE /podcasts/:id - Delete a podcast feed
#[utoipa::path(
    delete,
    path = "/api/v1/podcasts/{id}",
    tag = "podcasts",
    params(("id" = i64, Path, description = "Podcast ID")),
    responses(
        (status = 204, description = "Podcast feed deleted successfully"),
        (status = 404, description = "Podcast not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_podcast(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.service.db.delete_podcast(id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"code": "not_found", "message": "Podcast not found"}})),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to delete podcast: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": {"code": "database_error", "message": format!("Failed to delete podcast: {}", e)}}))).into_response()
        }
    }
}

/// POST /podcasts/:id/check - Force a feed check and annotation cycle now
#[utoipa::path(
    post,
    path = "/api/v1/podcasts/{id}/check",
    tag = "podcasts",
    params(("id" = i64, Path, description = "Podcast ID")),
    responses(
        (status = 200, description = "Cycle report for the checked feed", body = CycleReport),
        (status = 404, description = "Podcast not found"),
        (status = 409, description = "A cycle is already in progress"),
        (status = 503, description = "Service is shutting down"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn check_podcast(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.service.check_feed_now(PodcastId::new(id)).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e @ crate::Error::NotFound(_)) => e.into_response(),
        Err(e @ crate::Error::CycleInProgress) => e.into_response(),
        Err(e @ crate::Error::ShuttingDown) => e.into_response(),
        Err(e) => {
            tracing::error!("Failed to check podcast feed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": {"code": "check_failed", "message": format!("Failed to check podcast feed: {}", e)}}))).into_response()
        }
    }
}

/// Validate that a feed URL is safe (not targeting internal services).
pub(crate) fn validate_feed_url(url_str: &str) -> std::result::Result<(), String> {
    let parsed = url::Url::parse(url_str).map_err(|_| "Invalid URL format".to_string())?;

    // Only allow http and https schemes
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(format!(
                "URL scheme '{}' is not allowed; only http and https are supported",
                scheme
            ));
        }
    }

    // Check for localhost / loopback / private IP ranges
    if let Some(host) = parsed.host_str() {
        let host_lower = host.to_lowercase();
        if host_lower == "localhost"
            || host_lower == "127.0.0.1"
            || host_lower == "::1"
            || host_lower == "[::1]"
            || host_lower == "0.0.0.0"
            || host_lower.starts_with("10.")
            || host_lower.starts_with("192.168.")
            || host_lower == "169.254.169.254"
            || host_lower.ends_with(".internal")
            || host_lower.ends_with(".local")
        {
            return Err("URL targets a private/internal address".to_string());
        }
        // Check 172.16.0.0/12 range
        if let Some(second_octet) = host_lower
            .strip_prefix("172.")
            .and_then(|s| s.split('.').next())
        {
            if let Ok(octet) = second_octet.parse::<u8>() {
                if (16..=31).contains(&octet) {
                    return Err("URL targets a private/internal address".to_string());
                }
            }
        }
    } else {
        return Err("URL has no host".to_string());
    }

    Ok(())
}
