//! Error types for podbrief
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Feed, Pipeline, Database, etc.)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for podbrief operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for podbrief
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "digest.recipients")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Feed fetch or parse error
    #[error("feed error: {0}")]
    Feed(String),

    /// Annotation pipeline error
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Digest assembly or delivery error
    #[error("digest error: {0}")]
    Digest(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new work
    #[error("shutdown in progress: not accepting new work")]
    ShuttingDown,

    /// A feed-check/pipeline cycle is already running
    #[error("a pipeline cycle is already in progress")]
    CycleInProgress,

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),

    /// Constraint violation (e.g., duplicate key)
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Annotation pipeline errors, one variant per stage
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Episode audio could not be fetched
    #[error("audio fetch failed for episode {id}: {reason}")]
    AudioFetchFailed {
        /// The episode whose audio could not be fetched
        id: i64,
        /// The reason the fetch failed
        reason: String,
    },

    /// Episode audio exceeds the configured size limit
    #[error("audio for episode {id} is {size_bytes} bytes, limit is {limit_bytes}")]
    AudioTooLarge {
        /// The episode whose audio is too large
        id: i64,
        /// Reported or downloaded audio size in bytes
        size_bytes: u64,
        /// Configured maximum audio size in bytes
        limit_bytes: u64,
    },

    /// Speech-to-text service call failed
    #[error("transcription failed for episode {id}: {reason}")]
    TranscriptionFailed {
        /// The episode that failed to transcribe
        id: i64,
        /// The reason transcription failed
        reason: String,
    },

    /// Chat-completion summarization call failed
    #[error("summarization failed for episode {id}: {reason}")]
    SummarizationFailed {
        /// The episode that failed to summarize
        id: i64,
        /// The reason summarization failed
        reason: String,
    },

    /// Topic-relevance flagging call failed
    #[error("topic flagging failed for episode {id}: {reason}")]
    FlaggingFailed {
        /// The episode whose topics could not be flagged
        id: i64,
        /// The reason flagging failed
        reason: String,
    },

    /// Episode has no audio enclosure to process
    #[error("episode {id} has no audio enclosure")]
    NoAudio {
        /// The episode with no audio enclosure
        id: i64,
    },
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
/// It follows a standard format with machine-readable error codes,
/// human-readable messages, and optional contextual details.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "not_found",
///     "message": "Podcast 123 not found",
///     "details": {
///       "podcast_id": 123
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    ///
    /// Clients can use this for programmatic error handling.
    pub code: String,

    /// Human-readable error message
    ///
    /// This is suitable for displaying to end users.
    pub message: String,

    /// Optional additional context about the error
    ///
    /// This can include fields like podcast_id, episode_id, validation errors, etc.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create a "conflict" error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("conflict", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }
}

/// Convert errors to HTTP status codes for API responses
///
/// This trait maps domain errors to appropriate HTTP status codes.
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 409 Conflict - a cycle is already running
            Error::CycleInProgress => 409,

            // 422 Unprocessable Entity - Semantic errors
            Error::Pipeline(_) => 422,

            // 500 Internal Server Error - Server-side issues
            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Serialization(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - External collaborator errors
            Error::Feed(_) => 502,
            Error::Digest(_) => 502,
            Error::Network(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::Feed(_) => "feed_error",
            Error::Pipeline(e) => match e {
                PipelineError::AudioFetchFailed { .. } => "audio_fetch_failed",
                PipelineError::AudioTooLarge { .. } => "audio_too_large",
                PipelineError::TranscriptionFailed { .. } => "transcription_failed",
                PipelineError::SummarizationFailed { .. } => "summarization_failed",
                PipelineError::FlaggingFailed { .. } => "flagging_failed",
                PipelineError::NoAudio { .. } => "no_audio",
            },
            Error::Digest(_) => "digest_error",
            Error::Io(_) => "io_error",
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::CycleInProgress => "cycle_in_progress",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        // Add contextual details for specific error types
        let details = match &error {
            Error::Pipeline(PipelineError::AudioTooLarge {
                id,
                size_bytes,
                limit_bytes,
            }) => Some(serde_json::json!({
                "episode_id": id,
                "size_bytes": size_bytes,
                "limit_bytes": limit_bytes,
            })),
            Error::Pipeline(PipelineError::AudioFetchFailed { id, .. })
            | Error::Pipeline(PipelineError::TranscriptionFailed { id, .. })
            | Error::Pipeline(PipelineError::SummarizationFailed { id, .. })
            | Error::Pipeline(PipelineError::FlaggingFailed { id, .. })
            | Error::Pipeline(PipelineError::NoAudio { id }) => Some(serde_json::json!({
                "episode_id": id,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
