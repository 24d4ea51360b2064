//! REST API server module
//!
//! Provides an OpenAPI 3.1 compliant REST API for managing monitored feeds,
//! topics, and digest delivery, and for inspecting episode annotations.

use crate::{Config, PodBrief, Result};
use axum::{
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Podcast Feeds
/// - `GET /podcasts` - List podcast feeds
/// - `POST /podcasts` - Add podcast feed
/// - `GET /podcasts/:id` - Get single podcast feed
/// - `PUT /podcasts/:id` - Update podcast feed
/// - `DELETE /podcasts/:id` - Delete podcast feed
/// - `POST /podcasts/:id/check` - Force check feed now
///
/// ## Episodes
/// - `GET /episodes` - List episodes (filter by status, with pagination)
/// - `GET /episodes/:id` - Episode detail with transcript, summary, and flags
///
/// ## Topics
/// - `GET /topics` - List topics
/// - `POST /topics` - Add topic
/// - `GET /topics/:id` - Get single topic
/// - `PUT /topics/:id` - Update topic
/// - `DELETE /topics/:id` - Delete topic
///
/// ## Operations
/// - `POST /ops/check-feeds` - Check all feeds and annotate new episodes
/// - `POST /ops/digest` - Assemble and send a digest now
/// - `GET /digest/log` - Digest send history
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /events` - Server-sent events stream
/// - `POST /shutdown` - Graceful shutdown
pub fn create_router(service: Arc<PodBrief>, config: Arc<Config>) -> Router {
    let state = AppState::new(service, config.clone());

    // Build the router with all routes
    let router = Router::new()
        // Podcast Feeds
        .route("/podcasts", get(routes::list_podcasts))
        .route("/podcasts", post(routes::add_podcast))
        .route("/podcasts/:id", get(routes::get_podcast))
        .route("/podcasts/:id", put(routes::update_podcast))
        .route("/podcasts/:id", delete(routes::delete_podcast))
        .route("/podcasts/:id/check", post(routes::check_podcast))
        // Episodes
        .route("/episodes", get(routes::list_episodes))
        .route("/episodes/:id", get(routes::get_episode))
        // Topics
        .route("/topics", get(routes::list_topics))
        .route("/topics", post(routes::add_topic))
        .route("/topics/:id", get(routes::get_topic))
        .route("/topics/:id", put(routes::update_topic))
        .route("/topics/:id", delete(routes::delete_topic))
        // Operations
        .route("/ops/check-feeds", post(routes::check_feeds))
        .route("/ops/digest", post(routes::send_digest))
        .route("/digest/log", get(routes::digest_log))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream))
        .route("/shutdown", post(routes::shutdown));

    // Merge Swagger UI routes if enabled in config (before applying state)
    // Note: SwaggerUi will use the existing /openapi.json endpoint we already defined
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api/v1/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    // Add state to all routes
    let router = router.with_state(state);

    // Apply authentication middleware if API key is configured
    let router = if config.server.api.api_key.is_some() {
        router.layer(middleware::from_fn_with_state(
            config.server.api.api_key.clone(),
            auth::require_api_key,
        ))
    } else {
        router
    };

    // Apply CORS middleware if enabled in config (outermost, runs first)
    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// # Arguments
///
/// * `origins` - List of allowed origins (supports "*" for any origin)
///
/// # Returns
///
/// A configured CorsLayer that allows the specified origins, all methods,
/// and all headers for cross-origin requests.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    // Check if "*" (all origins) is in the list
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        // Allow all origins (default for local development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Allow specific origins
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// This function creates a TCP listener, binds it to the configured address,
/// and starts serving the API router. It runs until the server is shut down.
///
/// # Arguments
///
/// * `service` - Arc-wrapped PodBrief instance to handle API requests
/// * `config` - Arc-wrapped Config containing API configuration
///
/// # Returns
///
/// Returns a Result<()> that completes when the server stops, either due to
/// an error or graceful shutdown.
///
/// # Example
///
/// ```no_run
/// use podbrief::{Config, PodBrief};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let service = Arc::new(PodBrief::new((*config).clone()).await?);
///
/// // Start API server (blocks until shutdown)
/// podbrief::api::start_api_server(service, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(service: Arc<PodBrief>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(
        address = %bind_address,
        "Starting API server"
    );

    // Create the router with all routes
    let app = create_router(service, config);

    // Bind TCP listener to the configured address
    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %bind_address,
        "API server listening"
    );

    // Serve the API using the listener
    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}
