//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`podcasts`] — Podcast feed management
//! - [`episodes`] — Episode listing and annotation detail
//! - [`topics`] — Topic management
//! - [`ops`] — Manual triggers (feed check, digest) and digest history
//! - [`system`] — Health, events, OpenAPI, shutdown

use crate::db::{DigestLogRow, EpisodeRow, PodcastRow, TopicFlagRow, TopicRow};
use crate::types::EpisodeStatus;
use serde::{Deserialize, Serialize};

mod episodes;
mod ops;
mod podcasts;
mod system;
mod topics;

// Re-export all handlers so `routes::function_name` continues to work
pub use episodes::*;
pub use ops::*;
pub use podcasts::*;
pub use system::*;
pub use topics::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Request body for POST /podcasts and PUT /podcasts/:id
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AddPodcastRequest {
    /// Feed URL (RSS or Atom)
    pub url: String,
    /// Display title (defaults to the URL)
    pub title: Option<String>,
    /// Interval between feed checks in seconds (default: 3600)
    pub check_interval_secs: Option<i64>,
    /// Whether the feed is checked (default: true)
    pub enabled: Option<bool>,
}

/// Response shape for a podcast feed
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct PodcastResponse {
    /// Podcast ID
    pub id: i64,
    /// Display title
    pub title: String,
    /// Feed URL
    pub url: String,
    /// Interval between feed checks in seconds
    pub check_interval_secs: i64,
    /// Whether the feed is checked
    pub enabled: bool,
    /// Unix timestamp of the last feed check
    pub last_check: Option<i64>,
    /// Last error from checking the feed
    pub last_error: Option<String>,
    /// Unix timestamp when the podcast was added
    pub created_at: i64,
}

impl From<PodcastRow> for PodcastResponse {
    fn from(row: PodcastRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            url: row.url,
            check_interval_secs: row.check_interval_secs,
            enabled: row.enabled != 0,
            last_check: row.last_check,
            last_error: row.last_error,
            created_at: row.created_at,
        }
    }
}

/// Query parameters for GET /episodes
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct EpisodeQuery {
    /// Filter by pipeline status
    pub status: Option<EpisodeStatus>,
    /// Maximum number of items to return (default: 50)
    pub limit: Option<i64>,
    /// Number of items to skip (default: 0)
    pub offset: Option<i64>,
}

/// Episode list entry (transcript and summary omitted; see the detail endpoint)
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct EpisodeSummaryResponse {
    /// Episode ID
    pub id: i64,
    /// Podcast this episode belongs to
    pub podcast_id: i64,
    /// Episode title
    pub title: String,
    /// Pipeline status
    pub status: EpisodeStatus,
    /// Error message if a pipeline stage failed
    pub error_message: Option<String>,
    /// Unix timestamp of publication
    pub published_at: Option<i64>,
    /// Unix timestamp when the episode was discovered
    pub discovered_at: i64,
    /// Unix timestamp when annotation completed
    pub annotated_at: Option<i64>,
}

impl From<EpisodeRow> for EpisodeSummaryResponse {
    fn from(row: EpisodeRow) -> Self {
        Self {
            id: row.id,
            podcast_id: row.podcast_id,
            title: row.title,
            status: EpisodeStatus::from_i32(row.status),
            error_message: row.error_message,
            published_at: row.published_at,
            discovered_at: row.discovered_at,
            annotated_at: row.annotated_at,
        }
    }
}

/// Full episode detail including transcript, summary, and topic flags
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct EpisodeDetailResponse {
    /// Episode ID
    pub id: i64,
    /// Podcast this episode belongs to
    pub podcast_id: i64,
    /// Stable item identifier from the feed
    pub guid: String,
    /// Episode title
    pub title: String,
    /// Show notes / description from the feed
    pub description: Option<String>,
    /// Audio enclosure URL
    pub audio_url: Option<String>,
    /// Audio enclosure size in bytes
    pub audio_bytes: Option<i64>,
    /// Pipeline status
    pub status: EpisodeStatus,
    /// Error message if a pipeline stage failed
    pub error_message: Option<String>,
    /// Full transcript text
    pub transcript: Option<String>,
    /// Summary text
    pub summary: Option<String>,
    /// Per-topic relevance flags
    pub flags: Vec<TopicFlagResponse>,
    /// Unix timestamp of publication
    pub published_at: Option<i64>,
    /// Unix timestamp when the episode was discovered
    pub discovered_at: i64,
    /// Unix timestamp when annotation completed
    pub annotated_at: Option<i64>,
}

impl EpisodeDetailResponse {
    /// Build a detail response from an episode row and its flags
    pub fn from_row(row: EpisodeRow, flags: Vec<TopicFlagRow>) -> Self {
        Self {
            id: row.id,
            podcast_id: row.podcast_id,
            guid: row.guid,
            title: row.title,
            description: row.description,
            audio_url: row.audio_url,
            audio_bytes: row.audio_bytes,
            status: EpisodeStatus::from_i32(row.status),
            error_message: row.error_message,
            transcript: row.transcript,
            summary: row.summary,
            flags: flags.into_iter().map(TopicFlagResponse::from).collect(),
            published_at: row.published_at,
            discovered_at: row.discovered_at,
            annotated_at: row.annotated_at,
        }
    }
}

/// A single topic-relevance flag on an episode
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct TopicFlagResponse {
    /// Topic name
    pub topic: String,
    /// Whether the episode is relevant to this topic
    pub relevant: bool,
    /// Model's short reasoning, if any
    pub reason: Option<String>,
    /// Unix timestamp when the flag was recorded
    pub flagged_at: i64,
}

impl From<TopicFlagRow> for TopicFlagResponse {
    fn from(row: TopicFlagRow) -> Self {
        Self {
            topic: row.topic_name,
            relevant: row.relevant != 0,
            reason: row.reason,
            flagged_at: row.flagged_at,
        }
    }
}

/// Request body for POST /topics and PUT /topics/:id
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AddTopicRequest {
    /// Topic name (unique)
    pub name: String,
    /// Short description given to the flagging model
    pub description: Option<String>,
}

/// Response shape for a topic
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct TopicResponse {
    /// Topic ID
    pub id: i64,
    /// Topic name
    pub name: String,
    /// Description given to the flagging model
    pub description: Option<String>,
    /// Unix timestamp when the topic was added
    pub created_at: i64,
}

impl From<TopicRow> for TopicResponse {
    fn from(row: TopicRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

/// Query parameters for GET /digest/log
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DigestLogQuery {
    /// Maximum number of entries to return (default: 50)
    pub limit: Option<i64>,
}

/// One digest send attempt from the log
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DigestLogResponse {
    /// Log entry ID
    pub id: i64,
    /// Unix timestamp of the window lower bound
    pub window_start: i64,
    /// Unix timestamp of the window upper bound
    pub window_end: i64,
    /// Number of episodes in the digest
    pub episode_count: i64,
    /// Whether the relay accepted the mail
    pub sent: bool,
    /// Error message if the send failed
    pub error: Option<String>,
    /// Unix timestamp when the attempt was recorded
    pub created_at: i64,
}

impl From<DigestLogRow> for DigestLogResponse {
    fn from(row: DigestLogRow) -> Self {
        Self {
            id: row.id,
            window_start: row.window_start,
            window_end: row.window_end,
            episode_count: row.episode_count,
            sent: row.sent != 0,
            error: row.error,
            created_at: row.created_at,
        }
    }
}
