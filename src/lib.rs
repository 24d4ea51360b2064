//! # podbrief
//!
//! Backend library for monitoring podcast feeds, annotating new episodes with
//! transcripts, summaries, and topic flags, and mailing a periodic digest.
//!
//! ## Design Philosophy
//!
//! podbrief is designed to be:
//! - **Sequential by construction** - One annotation pipeline, one episode at
//!   a time, with a fixed delay between episodes
//! - **Forgiving of failure** - A failing feed or episode is logged and
//!   skipped; the cycle always continues
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use podbrief::{Config, PodBrief, run_with_shutdown};
//! use podbrief::config::PodcastFeedConfig;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         feeds: podbrief::config::FeedsConfig {
//!             podcasts: vec![PodcastFeedConfig {
//!                 url: "https://example.com/feed.xml".to_string(),
//!                 check_interval: Duration::from_secs(3600),
//!                 filters: vec![],
//!                 enabled: true,
//!             }],
//!             ..Default::default()
//!         },
//!         ..Default::default()
//!     };
//!
//!     let service = PodBrief::new(config).await?;
//!
//!     // Subscribe to events
//!     let mut events = service.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     // Start the feed poller and scheduler, then wait for a signal
//!     let _tasks = service.start_background_tasks();
//!     run_with_shutdown(service).await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Digest assembly and mail relay delivery
pub mod digest;
/// Error types
pub mod error;
/// Feed fetching, parsing, and diffing
pub mod feeds;
/// Sequential annotation pipeline (audio, transcribe, summarize, flag)
pub mod pipeline;
/// Per-feed interval polling
pub mod poller;
/// Time-based scheduling
pub mod scheduler;
/// Scheduler task execution
pub mod scheduler_task;
/// Core service facade (decomposed into focused submodules)
pub mod service;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use error::{
    ApiError, DatabaseError, Error, ErrorDetail, PipelineError, Result, ToHttpStatus,
};
pub use scheduler::{RuleId, ScheduleAction, ScheduleRule, Scheduler, Weekday};
pub use service::PodBrief;
pub use types::{
    Annotation, CycleReport, DigestReport, EpisodeId, EpisodeStatus, Event, PodcastId, TopicFlag,
};

/// Helper function to run the service with graceful signal handling.
///
/// Waits for a termination signal and then calls the service's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use podbrief::{Config, PodBrief, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let service = PodBrief::new(config).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(service).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(service: PodBrief) -> Result<()> {
    wait_for_signal().await;
    service.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
