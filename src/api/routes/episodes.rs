//! Episode listing and annotation detail handlers.

use super::{EpisodeDetailResponse, EpisodeQuery, EpisodeSummaryResponse};
use crate::api::AppState;
use crate::types::EpisodeId;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

/// GET /episodes - List episodes, newest first
#[utoipa::path(
    get,
    path = "/api/v1/episodes",
    tag = "episodes",
    params(
        ("status" = Option<String>, Query, description = "Filter by pipeline status (e.g. 'discovered', 'annotated', 'failed')"),
        ("limit" = Option<i64>, Query, description = "Maximum number of items to return (default: 50)"),
        ("offset" = Option<i64>, Query, description = "Number of items to skip (default: 0)")
    ),
    responses(
        (status = 200, description = "List of episodes", body = Vec<EpisodeSummaryResponse>),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_episodes(
    State(state): State<AppState>,
    Query(query): Query<EpisodeQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    match state
        .service
        .db
        .list_episodes(query.status, limit, offset)
        .await
    {
        Ok(rows) => {
            let episodes: Vec<EpisodeSummaryResponse> =
                rows.into_iter().map(EpisodeSummaryResponse::from).collect();
            (StatusCode::OK, Json(episodes)).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to list episodes: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": {"code": "database_error", "message": format!("Failed to list episodes: {}", e)}}))).into_response()
        }
    }
}

/// GET /episodes/:id - Get episode detail with transcript, summary, and flags
#[utoipa::path(
    get,
    path = "/api/v1/episodes/{id}",
    tag = "episodes",
    params(("id" = i64, Path, description = "Episode ID")),
    responses(
        (status = 200, description = "Episode detail", body = EpisodeDetailResponse),
        (status = 404, description = "Episode not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_episode(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    let episode = match state.service.db.get_episode(EpisodeId::new(id)).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"error": {"code": "not_found", "message": "Episode not found"}})),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("Failed to get episode: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": {"code": "database_error", "message": format!("Failed to get episode: {}", e)}}))).into_response();
        }
    };

    let flags = match state.service.db.get_topic_flags(EpisodeId::new(id)).await {
        Ok(f) => f,
        Err(e) => {
            tracing::error!("Failed to get topic flags for episode {}: {}", id, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": {"code": "database_error", "message": format!("Failed to get topic flags: {}", e)}}))).into_response();
        }
    };

    (
        StatusCode::OK,
        Json(EpisodeDetailResponse::from_row(episode, flags)),
    )
        .into_response()
}
