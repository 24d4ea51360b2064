//! Configuration types for podbrief

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Main configuration for PodBrief
///
/// Fields are organized into logical sub-configs for maintainability:
/// - [`feeds`](FeedsConfig) — feed polling and episode filtering
/// - [`pipeline`](PipelineConfig) — annotation pipeline behavior
/// - [`transcription`](TranscriptionConfig) — speech-to-text collaborator
/// - [`summarization`](SummarizationConfig) — chat-completion collaborator
/// - [`digest`](DigestConfig) — digest assembly and mail relay
/// - [`persistence`](PersistenceConfig) — database and schedule rules
/// - [`server`](ServerIntegrationConfig) — REST API
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Feed polling settings
    #[serde(default)]
    pub feeds: FeedsConfig,

    /// Annotation pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Speech-to-text collaborator settings
    #[serde(default)]
    pub transcription: TranscriptionConfig,

    /// Chat-completion collaborator settings (summaries and topic flags)
    #[serde(default)]
    pub summarization: SummarizationConfig,

    /// Topics to flag episodes against
    #[serde(default)]
    pub topics: Vec<TopicConfig>,

    /// Digest assembly and delivery settings
    #[serde(default)]
    pub digest: DigestConfig,

    /// Data storage and schedule rules
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

/// Feed polling configuration
///
/// Feeds configured here are merged into the database on startup; feeds added
/// via the API live only in the database.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct FeedsConfig {
    /// Podcast feeds to monitor
    #[serde(default)]
    pub podcasts: Vec<PodcastFeedConfig>,

    /// HTTP timeout for feed fetches (default: 30 seconds)
    #[serde(default = "default_feed_timeout", with = "duration_serde")]
    pub fetch_timeout: Duration,

    /// User-Agent header sent with feed requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            podcasts: vec![],
            fetch_timeout: default_feed_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Configuration for a single podcast feed
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PodcastFeedConfig {
    /// Feed URL (RSS or Atom)
    pub url: String,

    /// How often to check the feed (default: 1 hour)
    #[serde(default = "default_check_interval", with = "duration_serde")]
    pub check_interval: Duration,

    /// Only annotate items matching these filters (empty = all items)
    #[serde(default)]
    pub filters: Vec<EpisodeFilter>,

    /// Whether feed is active
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Episode filter applied to new feed items
///
/// Items that do not pass any configured filter are marked seen but never
/// enter the pipeline.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EpisodeFilter {
    /// Filter name (for UI)
    pub name: String,

    /// Patterns to include (regex, matched against title + description)
    #[serde(default)]
    pub include: Vec<String>,

    /// Patterns to exclude (regex)
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Maximum age from publish date (seconds)
    #[serde(default, with = "optional_duration_serde")]
    pub max_age: Option<Duration>,
}

/// Annotation pipeline configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PipelineConfig {
    /// Fixed delay between episodes within one cycle (default: 5 seconds)
    ///
    /// The pipeline is strictly sequential; this spaces out calls to the
    /// external collaborators.
    #[serde(default = "default_episode_delay", with = "duration_serde")]
    pub episode_delay: Duration,

    /// Maximum episodes to process in one cycle (default: 10)
    ///
    /// Remaining episodes stay in `discovered` and are picked up next cycle.
    #[serde(default = "default_max_episodes_per_cycle")]
    pub max_episodes_per_cycle: usize,

    /// Maximum audio size to download, in bytes (default: 500 MB)
    #[serde(default = "default_max_audio_bytes")]
    pub max_audio_bytes: u64,

    /// HTTP timeout for audio fetches (default: 120 seconds)
    #[serde(default = "default_audio_timeout", with = "duration_serde")]
    pub audio_fetch_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            episode_delay: default_episode_delay(),
            max_episodes_per_cycle: default_max_episodes_per_cycle(),
            max_audio_bytes: default_max_audio_bytes(),
            audio_fetch_timeout: default_audio_timeout(),
        }
    }
}

/// Speech-to-text collaborator configuration
///
/// The service is an opaque HTTP collaborator: multipart audio upload in,
/// JSON `{"text": ...}` out.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TranscriptionConfig {
    /// Base URL of the transcription endpoint
    #[serde(default = "default_transcription_url")]
    pub endpoint: String,

    /// API key sent as a bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier passed to the service
    #[serde(default = "default_transcription_model")]
    pub model: String,

    /// Request timeout (default: 10 minutes; transcription is slow)
    #[serde(default = "default_transcription_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_transcription_url(),
            api_key: None,
            model: default_transcription_model(),
            timeout: default_transcription_timeout(),
        }
    }
}

/// Chat-completion collaborator configuration
///
/// Used for both summarization and topic flagging: prompt in, structured
/// text out.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SummarizationConfig {
    /// Base URL of the chat-completion endpoint
    #[serde(default = "default_completion_url")]
    pub endpoint: String,

    /// API key sent as a bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier passed to the service
    #[serde(default = "default_completion_model")]
    pub model: String,

    /// Request timeout (default: 120 seconds)
    #[serde(default = "default_completion_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Maximum transcript characters sent per request (default: 48000)
    ///
    /// Longer transcripts are truncated before prompting.
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_completion_url(),
            api_key: None,
            model: default_completion_model(),
            timeout: default_completion_timeout(),
            max_prompt_chars: default_max_prompt_chars(),
        }
    }
}

/// A topic episodes are flagged against
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TopicConfig {
    /// Topic name (unique)
    pub name: String,

    /// Short description given to the flagging model
    #[serde(default)]
    pub description: Option<String>,
}

/// Digest assembly and delivery configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DigestConfig {
    /// Mail relay endpoint (HTTP JSON POST)
    #[serde(default)]
    pub relay_url: Option<String>,

    /// API key for the mail relay, sent as a bearer token
    #[serde(default)]
    pub relay_api_key: Option<String>,

    /// From address
    #[serde(default = "default_digest_from")]
    pub from: String,

    /// Recipient addresses
    #[serde(default)]
    pub recipients: Vec<String>,

    /// Subject prefix (date is appended)
    #[serde(default = "default_digest_subject")]
    pub subject_prefix: String,

    /// Timeout for relay requests (default: 30 seconds)
    #[serde(default = "default_relay_timeout", with = "duration_serde")]
    pub relay_timeout: Duration,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            relay_url: None,
            relay_api_key: None,
            from: default_digest_from(),
            recipients: vec![],
            subject_prefix: default_digest_subject(),
            relay_timeout: default_relay_timeout(),
        }
    }
}

/// Data storage and state management configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Database path (default: "./podbrief.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Schedule rules for time-based triggers
    ///
    /// When empty, a single default rule sends the digest daily at 07:00.
    #[serde(default)]
    pub schedule_rules: Vec<crate::scheduler::ScheduleRule>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            schedule_rules: vec![],
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:7373)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Optional API key for authentication
    #[serde(default)]
    pub api_key: Option<String>,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_key: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_feed_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("podbrief/{}", env!("CARGO_PKG_VERSION"))
}

fn default_check_interval() -> Duration {
    Duration::from_secs(60 * 60) // 1 hour
}

fn default_episode_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_max_episodes_per_cycle() -> usize {
    10
}

fn default_max_audio_bytes() -> u64 {
    500 * 1024 * 1024 // 500 MB
}

fn default_audio_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_transcription_url() -> String {
    "https://api.openai.com/v1/audio/transcriptions".to_string()
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_transcription_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_completion_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_completion_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_completion_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_max_prompt_chars() -> usize {
    48_000
}

fn default_digest_from() -> String {
    "podbrief@localhost".to_string()
}

fn default_digest_subject() -> String {
    "Podcast brief".to_string()
}

fn default_relay_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_database_path() -> PathBuf {
    PathBuf::from("podbrief.db")
}

fn default_bind_address() -> SocketAddr {
    use std::net::{IpAddr, Ipv4Addr};
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 7373)
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Duration serialization helper
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
pub(crate) mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
