//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the podbrief REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the podbrief REST API
///
/// This struct is used to generate the OpenAPI 3.1 specification that describes
/// all available endpoints, request/response types, and API behavior.
///
/// The spec can be accessed via:
/// - `/api/v1/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "podbrief REST API",
        version = "0.2.0",
        description = "REST API for managing monitored podcast feeds, topics, episode annotations, and digest delivery",
        contact(
            name = "podbrief",
            url = "https://github.com/podbrief/podbrief"
        ),
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:7373/api/v1", description = "Local development server")
    ),
    paths(
        // Podcast feeds
        crate::api::routes::list_podcasts,
        crate::api::routes::get_podcast,
        crate::api::routes::add_podcast,
        crate::api::routes::update_podcast,
        crate::api::routes::delete_podcast,
        crate::api::routes::check_podcast,

        // Episodes
        crate::api::routes::list_episodes,
        crate::api::routes::get_episode,

        // Topics
        crate::api::routes::list_topics,
        crate::api::routes::get_topic,
        crate::api::routes::add_topic,
        crate::api::routes::update_topic,
        crate::api::routes::delete_topic,

        // Manual triggers and digest history
        crate::api::routes::check_feeds,
        crate::api::routes::send_digest,
        crate::api::routes::digest_log,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
        crate::api::routes::shutdown,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::PodcastId,
        crate::types::EpisodeId,
        crate::types::EpisodeStatus,
        crate::types::TopicFlag,
        crate::types::CycleReport,
        crate::types::DigestReport,
        crate::types::Event,

        // Config types from config.rs
        crate::config::Config,
        crate::config::FeedsConfig,
        crate::config::PodcastFeedConfig,
        crate::config::EpisodeFilter,
        crate::config::PipelineConfig,
        crate::config::TranscriptionConfig,
        crate::config::SummarizationConfig,
        crate::config::TopicConfig,
        crate::config::DigestConfig,
        crate::config::PersistenceConfig,
        crate::config::ApiConfig,

        // Scheduler types
        crate::scheduler::ScheduleRule,
        crate::scheduler::ScheduleAction,
        crate::scheduler::Weekday,

        // API request/response types from routes
        crate::api::routes::AddPodcastRequest,
        crate::api::routes::PodcastResponse,
        crate::api::routes::EpisodeQuery,
        crate::api::routes::EpisodeSummaryResponse,
        crate::api::routes::EpisodeDetailResponse,
        crate::api::routes::TopicFlagResponse,
        crate::api::routes::AddTopicRequest,
        crate::api::routes::TopicResponse,
        crate::api::routes::DigestLogQuery,
        crate::api::routes::DigestLogResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "podcasts", description = "Podcast feeds - Add, update, and force-check monitored feeds"),
        (name = "episodes", description = "Episodes - List discovered episodes and read their annotations"),
        (name = "topics", description = "Topics - Manage topics episodes are flagged against"),
        (name = "ops", description = "Operations - Manual feed checks, digest sends, and digest history"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events, shutdown"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security addon to add API key authentication scheme to OpenAPI spec
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-Api-Key"),
                    ),
                ),
            );
        }
    }
}
