//! Database layer for podbrief
//!
//! Handles SQLite persistence for podcasts, episodes, topics, and digests.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`podcasts`] — Podcast feed CRUD
//! - [`episodes`] — Episode records and annotation results
//! - [`topics`] — Topic CRUD and per-episode relevance flags
//! - [`digest`] — Digest windows and send log
//! - [`state`] — Runtime state (shutdown tracking, seen feed items)

use sqlx::{FromRow, sqlite::SqlitePool};

mod digest;
mod episodes;
mod migrations;
mod podcasts;
mod state;
mod topics;

/// Podcast record from database
#[derive(Debug, Clone, FromRow)]
pub struct PodcastRow {
    /// Unique database ID
    pub id: i64,
    /// Podcast display title
    pub title: String,
    /// Feed URL (RSS or Atom)
    pub url: String,
    /// Interval between feed checks in seconds
    pub check_interval_secs: i64,
    /// Whether the feed is checked (0 = disabled, 1 = enabled)
    pub enabled: i32,
    /// Unix timestamp of last feed check
    pub last_check: Option<i64>,
    /// Last error message from checking the feed
    pub last_error: Option<String>,
    /// Unix timestamp when podcast was added
    pub created_at: i64,
}

/// Parameters for inserting a new podcast
pub struct InsertPodcastParams<'a> {
    /// Display title
    pub title: &'a str,
    /// Feed URL
    pub url: &'a str,
    /// Check interval in seconds
    pub check_interval_secs: i64,
    /// Whether the feed is checked
    pub enabled: bool,
}

/// Parameters for updating an existing podcast
pub struct UpdatePodcastParams<'a> {
    /// Podcast ID
    pub id: i64,
    /// Display title
    pub title: &'a str,
    /// Feed URL
    pub url: &'a str,
    /// Check interval in seconds
    pub check_interval_secs: i64,
    /// Whether the feed is checked
    pub enabled: bool,
}

/// New episode to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewEpisode {
    /// Podcast this episode belongs to
    pub podcast_id: crate::types::PodcastId,
    /// Stable item identifier (guid, or enclosure URL / title fallback)
    pub guid: String,
    /// Episode title
    pub title: String,
    /// Show notes / description from the feed
    pub description: Option<String>,
    /// Audio enclosure URL
    pub audio_url: Option<String>,
    /// Audio enclosure size in bytes, if the feed declares it
    pub audio_bytes: Option<i64>,
    /// Unix timestamp of publication
    pub published_at: Option<i64>,
}

/// Episode record from database
#[derive(Debug, Clone, FromRow)]
pub struct EpisodeRow {
    /// Unique database ID
    pub id: i64,
    /// Podcast this episode belongs to
    pub podcast_id: i64,
    /// Stable item identifier
    pub guid: String,
    /// Episode title
    pub title: String,
    /// Show notes / description from the feed
    pub description: Option<String>,
    /// Audio enclosure URL
    pub audio_url: Option<String>,
    /// Audio enclosure size in bytes
    pub audio_bytes: Option<i64>,
    /// Unix timestamp of publication
    pub published_at: Option<i64>,
    /// Pipeline status code (see [`crate::types::EpisodeStatus`])
    pub status: i32,
    /// Error message if a pipeline stage failed
    pub error_message: Option<String>,
    /// Full transcript text
    pub transcript: Option<String>,
    /// Summary text
    pub summary: Option<String>,
    /// Unix timestamp when the episode was discovered
    pub discovered_at: i64,
    /// Unix timestamp when annotation completed
    pub annotated_at: Option<i64>,
}

/// Topic record from database
#[derive(Debug, Clone, FromRow)]
pub struct TopicRow {
    /// Unique database ID
    pub id: i64,
    /// Topic name (unique)
    pub name: String,
    /// Description given to the flagging model
    pub description: Option<String>,
    /// Unix timestamp when topic was added
    pub created_at: i64,
}

/// Topic flag record joined with its topic name
#[derive(Debug, Clone, FromRow)]
pub struct TopicFlagRow {
    /// Unique database ID
    pub id: i64,
    /// Episode this flag belongs to
    pub episode_id: i64,
    /// Topic this flag refers to
    pub topic_id: i64,
    /// Topic name at flag time
    pub topic_name: String,
    /// Relevance decision (0 = not relevant, 1 = relevant)
    pub relevant: i32,
    /// Model's short reasoning, if any
    pub reason: Option<String>,
    /// Unix timestamp when the flag was recorded
    pub flagged_at: i64,
}

/// Episode joined with its podcast title, for digest assembly
#[derive(Debug, Clone, FromRow)]
pub struct DigestEpisodeRow {
    /// Episode database ID
    pub id: i64,
    /// Podcast title
    pub podcast_title: String,
    /// Episode title
    pub title: String,
    /// Summary text
    pub summary: Option<String>,
    /// Unix timestamp when annotation completed
    pub annotated_at: Option<i64>,
}

/// Digest send record from database
#[derive(Debug, Clone, FromRow)]
pub struct DigestLogRow {
    /// Unique database ID
    pub id: i64,
    /// Unix timestamp of the window lower bound
    pub window_start: i64,
    /// Unix timestamp of the window upper bound
    pub window_end: i64,
    /// Number of episodes in the digest
    pub episode_count: i64,
    /// Whether the relay accepted the mail (0 = no, 1 = yes)
    pub sent: i32,
    /// Error message if the send failed
    pub error: Option<String>,
    /// Unix timestamp when the attempt was recorded
    pub created_at: i64,
}

/// Database handle for podbrief
pub struct Database {
    pool: SqlitePool,
}
