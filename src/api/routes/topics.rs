//! Topic management handlers.

use super::{AddTopicRequest, TopicResponse};
use crate::api::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

/// GET /topics - List topics
#[utoipa::path(
    get,
    path = "/api/v1/topics",
    tag = "topics",
    responses(
        (status = 200, description = "List of topics", body = Vec<TopicResponse>),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_topics(State(state): State<AppState>) -> impl IntoResponse {
    match state.service.db.get_all_topics().await {
        Ok(rows) => {
            let topics: Vec<TopicResponse> = rows.into_iter().map(TopicResponse::from).collect();
            (StatusCode::OK, Json(topics)).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to get topics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": {"code": "database_error", "message": format!("Failed to get topics: {}", e)}}))).into_response()
        }
    }
}

/// GET /topics/:id - Get a single topic
#[utoipa::path(
    get,
    path = "/api/v1/topics/{id}",
    tag = "topics",
    params(("id" = i64, Path, description = "Topic ID")),
    responses(
        (status = 200, description = "Topic", body = TopicResponse),
        (status = 404, description = "Topic not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_topic(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    match state.service.db.get_topic(id).await {
        Ok(Some(row)) => (StatusCode::OK, Json(TopicResponse::from(row))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"code": "not_found", "message": "Topic not found"}})),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to get topic: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": {"code": "database_error", "message": format!("Failed to get topic: {}", e)}}))).into_response()
        }
    }
}

/// POST /topics - Add a topic
///
/// New topics apply to episodes annotated after the topic is added; existing
/// annotations are not re-flagged.
#[utoipa::path(
    post,
    path = "/api/v1/topics",
    tag = "topics",
    request_body = AddTopicRequest,
    responses(
        (status = 201, description = "Topic added successfully", body = TopicResponse),
        (status = 400, description = "Invalid topic"),
        (status = 409, description = "Topic name already exists"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn add_topic(
    State(state): State<AppState>,
    Json(request): Json<AddTopicRequest>,
) -> impl IntoResponse {
    if request.name.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(
                json!({"error": {"code": "invalid_input", "message": "Topic name cannot be empty"}}),
            ),
        )
            .into_response();
    }

    match state.service.db.get_topic_by_name(&request.name).await {
        Ok(Some(_)) => {
            return (
                StatusCode::CONFLICT,
                Json(json!({"error": {"code": "conflict", "message": "Topic name already exists"}})),
            )
                .into_response();
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!("Failed to check for existing topic: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": {"code": "database_error", "message": format!("Failed to add topic: {}", e)}}))).into_response();
        }
    }

    let id = match state
        .service
        .db
        .insert_topic(&request.name, request.description.as_deref())
        .await
    {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("Failed to add topic: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": {"code": "database_error", "message": format!("Failed to add topic: {}", e)}}))).into_response();
        }
    };

    match state.service.db.get_topic(id).await {
        Ok(Some(row)) => (StatusCode::CREATED, Json(TopicResponse::from(row))).into_response(),
        Ok(None) => (StatusCode::CREATED, Json(json!({"id": id}))).into_response(),
        Err(e) => {
            tracing::error!("Failed to read back topic: {}", e);
            (StatusCode::CREATED, Json(json!({"id": id}))).into_response()
        }
    }
}

/// PUT /topics/:id - Update a topic
#[utoipa::path(
    put,
    path = "/api/v1/topics/{id}",
    tag = "topics",
    params(("id" = i64, Path, description = "Topic ID")),
    request_body = AddTopicRequest,
    responses(
        (status = 204, description = "Topic updated successfully"),
        (status = 400, description = "Invalid topic"),
        (status = 404, description = "Topic not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_topic(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<AddTopicRequest>,
) -> impl IntoResponse {
    if request.name.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(
                json!({"error": {"code": "invalid_input", "message": "Topic name cannot be empty"}}),
            ),
        )
            .into_response();
    }

    match state
        .service
        .db
        .update_topic(id, &request.name, request.description.as_deref())
        .await
    {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"code": "not_found", "message": "Topic not found"}})),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to update topic: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": {"code": "database_error", "message": format!("Failed to update topic: {}", e)}}))).into_response()
        }
    }
}

/// DELETE /topics/:id - Delete a topic (its flags are removed with it)
#[utoipa::path(
    delete,
    path = "/api/v1/topics/{id}",
    tag = "topics",
    params(("id" = i64, Path, description = "Topic ID")),
    responses(
        (status = 204, description = "Topic deleted successfully"),
        (status = 404, description = "Topic not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_topic(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    match state.service.db.delete_topic(id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"code": "not_found", "message": "Topic not found"}})),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to delete topic: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": {"code": "database_error", "message": format!("Failed to delete topic: {}", e)}}))).into_response()
        }
    }
}
