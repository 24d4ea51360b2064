//! Core types for podbrief

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Unique identifier for a podcast feed
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct PodcastId(pub i64);

impl PodcastId {
    /// Create a new PodcastId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for PodcastId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<PodcastId> for i64 {
    fn from(id: PodcastId) -> Self {
        id.0
    }
}

impl PartialEq<i64> for PodcastId {
    fn eq(&self, other: &i64) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for PodcastId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PodcastId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Unique identifier for an episode
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct EpisodeId(pub i64);

impl EpisodeId {
    /// Create a new EpisodeId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for EpisodeId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<EpisodeId> for i64 {
    fn from(id: EpisodeId) -> Self {
        id.0
    }
}

impl PartialEq<i64> for EpisodeId {
    fn eq(&self, other: &i64) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EpisodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

// Implement sqlx Type, Encode, and Decode so IDs can bind directly in queries
macro_rules! impl_sqlite_id {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Sqlite> for $ty {
            fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
            }

            fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
                <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
            ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
                sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for $ty {
            fn decode(
                value: sqlx::sqlite::SqliteValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
                Ok(Self(id))
            }
        }
    };
}

impl_sqlite_id!(PodcastId);
impl_sqlite_id!(EpisodeId);

/// Episode annotation status
///
/// Episodes move through the pipeline stages strictly in order. `Failed` and
/// `Skipped` are terminal; a failed episode is not retried automatically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeStatus {
    /// New item detected in the feed, not yet processed
    Discovered,
    /// Fetching episode audio
    Fetching,
    /// Speech-to-text in progress
    Transcribing,
    /// Summarization in progress
    Summarizing,
    /// Topic-relevance flagging in progress
    Flagging,
    /// Fully annotated (transcript, summary, flags persisted)
    Annotated,
    /// A pipeline stage failed; error recorded on the episode
    Failed,
    /// Not processable (e.g., no audio enclosure)
    Skipped,
}

impl EpisodeStatus {
    /// Convert integer status code to EpisodeStatus enum
    pub fn from_i32(status: i32) -> Self {
        match status {
            0 => EpisodeStatus::Discovered,
            1 => EpisodeStatus::Fetching,
            2 => EpisodeStatus::Transcribing,
            3 => EpisodeStatus::Summarizing,
            4 => EpisodeStatus::Flagging,
            5 => EpisodeStatus::Annotated,
            6 => EpisodeStatus::Failed,
            7 => EpisodeStatus::Skipped,
            _ => EpisodeStatus::Failed, // Default to Failed for unknown status
        }
    }

    /// Convert EpisodeStatus enum to integer status code
    pub fn to_i32(&self) -> i32 {
        match self {
            EpisodeStatus::Discovered => 0,
            EpisodeStatus::Fetching => 1,
            EpisodeStatus::Transcribing => 2,
            EpisodeStatus::Summarizing => 3,
            EpisodeStatus::Flagging => 4,
            EpisodeStatus::Annotated => 5,
            EpisodeStatus::Failed => 6,
            EpisodeStatus::Skipped => 7,
        }
    }

    /// True for the mid-pipeline states that should not survive a restart
    ///
    /// After an unclean shutdown, episodes stuck in one of these states are
    /// reset to `Discovered` so the next cycle picks them up again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EpisodeStatus::Fetching
                | EpisodeStatus::Transcribing
                | EpisodeStatus::Summarizing
                | EpisodeStatus::Flagging
        )
    }

    /// True if no further pipeline work will happen for this episode
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EpisodeStatus::Annotated | EpisodeStatus::Failed | EpisodeStatus::Skipped
        )
    }

    /// All status values, in pipeline order
    pub fn all() -> &'static [EpisodeStatus] {
        &[
            EpisodeStatus::Discovered,
            EpisodeStatus::Fetching,
            EpisodeStatus::Transcribing,
            EpisodeStatus::Summarizing,
            EpisodeStatus::Flagging,
            EpisodeStatus::Annotated,
            EpisodeStatus::Failed,
            EpisodeStatus::Skipped,
        ]
    }
}

/// Annotation produced for one episode by the pipeline
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Annotation {
    /// Full transcript text from the speech-to-text service
    pub transcript: String,
    /// Summary text from the chat-completion service
    pub summary: String,
    /// Per-topic relevance flags
    pub flags: Vec<TopicFlag>,
}

/// A single topic-relevance decision for an episode
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TopicFlag {
    /// Topic name as configured
    pub topic: String,
    /// Whether the episode is relevant to this topic
    pub relevant: bool,
    /// Short model-provided justification, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Outcome of one feed-check/pipeline cycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CycleReport {
    /// Number of feeds checked
    pub feeds_checked: usize,
    /// Number of feeds whose fetch or parse failed
    pub feeds_failed: usize,
    /// New episodes discovered this cycle
    pub episodes_discovered: usize,
    /// Episodes fully annotated this cycle
    pub episodes_annotated: usize,
    /// Episodes that failed a pipeline stage this cycle
    pub episodes_failed: usize,
    /// Episodes skipped (no audio enclosure)
    pub episodes_skipped: usize,
}

/// Outcome of one digest assembly/send
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DigestReport {
    /// Number of episodes included in the digest
    pub episodes: usize,
    /// Start of the covered window (previous successful send)
    pub window_start: DateTime<Utc>,
    /// End of the covered window
    pub window_end: DateTime<Utc>,
    /// True if a message was actually handed to the mail relay
    ///
    /// False when the window contained no annotated episodes.
    pub sent: bool,
}

/// Event emitted during feed checking, annotation, and digest delivery
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A feed-check cycle started
    CycleStarted,

    /// A feed-check cycle finished
    CycleComplete {
        /// Summary of the cycle
        report: CycleReport,
    },

    /// A single feed was checked
    FeedChecked {
        /// Podcast ID
        podcast_id: PodcastId,
        /// Number of items in the feed
        items: usize,
        /// Number of new (unseen) items
        new_items: usize,
    },

    /// A feed fetch or parse failed
    FeedFailed {
        /// Podcast ID
        podcast_id: PodcastId,
        /// Error message
        error: String,
    },

    /// A new episode was discovered in a feed
    EpisodeDiscovered {
        /// Episode ID
        id: EpisodeId,
        /// Episode title
        title: String,
    },

    /// An episode entered a new pipeline stage
    StageStarted {
        /// Episode ID
        id: EpisodeId,
        /// The status/stage the episode entered
        status: EpisodeStatus,
    },

    /// An episode was fully annotated
    EpisodeAnnotated {
        /// Episode ID
        id: EpisodeId,
        /// Number of topics flagged relevant
        relevant_topics: usize,
    },

    /// An episode failed a pipeline stage
    EpisodeFailed {
        /// Episode ID
        id: EpisodeId,
        /// Error message
        error: String,
    },

    /// An episode was skipped (e.g., no audio enclosure)
    EpisodeSkipped {
        /// Episode ID
        id: EpisodeId,
        /// Reason for skipping
        reason: String,
    },

    /// A digest was assembled and handed to the mail relay
    DigestSent {
        /// Summary of the digest
        report: DigestReport,
    },

    /// Digest delivery failed
    DigestFailed {
        /// Error message
        error: String,
    },

    /// Service is shutting down
    Shutdown,
}

impl Event {
    /// Stable event-type string used for SSE event names
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::CycleStarted => "cycle_started",
            Event::CycleComplete { .. } => "cycle_complete",
            Event::FeedChecked { .. } => "feed_checked",
            Event::FeedFailed { .. } => "feed_failed",
            Event::EpisodeDiscovered { .. } => "episode_discovered",
            Event::StageStarted { .. } => "stage_started",
            Event::EpisodeAnnotated { .. } => "episode_annotated",
            Event::EpisodeFailed { .. } => "episode_failed",
            Event::EpisodeSkipped { .. } => "episode_skipped",
            Event::DigestSent { .. } => "digest_sent",
            Event::DigestFailed { .. } => "digest_failed",
            Event::Shutdown => "shutdown",
        }
    }
}
