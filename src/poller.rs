//! Per-feed interval polling.
//!
//! This module provides the background task that checks each podcast feed on
//! its own interval. Feeds are read from the database every pass so feeds
//! added or disabled via the API are picked up without a restart.
//!
//! # Features
//!
//! - Independent per-feed check intervals
//! - Respects feed enable/disable state
//! - Graceful shutdown handling
//! - Skips quietly when a manual cycle is already running
//!
//! # Example
//!
//! ```no_run
//! use podbrief::{PodBrief, config::Config};
//! use podbrief::poller::FeedPoller;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = Arc::new(PodBrief::new(Config::default()).await?);
//! let poller = FeedPoller::new(service.clone());
//!
//! // Run poller (blocks until shutdown)
//! tokio::spawn(async move {
//!     poller.run().await;
//! });
//! # Ok(())
//! # }
//! ```

use crate::error::Error;
use crate::service::PodBrief;
use crate::types::PodcastId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::time::{Duration, sleep};
use tracing::{debug, error, info, warn};

/// Feed poller that periodically checks configured podcast feeds
///
/// Each feed is checked independently according to its own
/// `check_interval_secs` setting from the database.
pub struct FeedPoller {
    /// Reference to the service for running feed checks
    service: Arc<PodBrief>,
}

impl FeedPoller {
    /// Creates a new feed poller
    pub fn new(service: Arc<PodBrief>) -> Self {
        Self { service }
    }

    /// Starts the feed polling loop
    ///
    /// This runs in a loop checking each feed according to its check interval.
    /// The poller will:
    /// 1. Check if shutdown was requested
    /// 2. For each enabled feed whose interval has elapsed, run a single-feed
    ///    check cycle (fetch, diff, annotate)
    /// 3. Sleep briefly before the next pass
    ///
    /// Each feed tracks its last check time independently. Feeds are checked
    /// when current_time - last_check >= check_interval.
    pub async fn run(self) {
        info!("Feed poller started");

        // Track last check time per podcast ID
        let mut last_check_times: HashMap<i64, SystemTime> = HashMap::new();

        loop {
            if !self.service.is_running() {
                info!("Feed poller shutting down");
                break;
            }

            let podcasts = match self.service.db.get_all_podcasts().await {
                Ok(p) => p,
                Err(e) => {
                    error!(error = %e, "Failed to load podcasts from database");
                    sleep(Duration::from_secs(30)).await;
                    continue;
                }
            };

            if podcasts.is_empty() {
                debug!("No podcast feeds configured, poller idle");
                sleep(Duration::from_secs(30)).await;
                continue;
            }

            let now = SystemTime::now();

            for podcast in &podcasts {
                if podcast.enabled == 0 {
                    debug!(url = %podcast.url, "Feed disabled, skipping");
                    continue;
                }

                let interval = Duration::from_secs(podcast.check_interval_secs.max(0) as u64);
                let should_check = match last_check_times.get(&podcast.id) {
                    Some(last_check) => match now.duration_since(*last_check) {
                        Ok(elapsed) => elapsed >= interval,
                        Err(_) => {
                            warn!(url = %podcast.url, "System time went backwards, checking feed");
                            true
                        }
                    },
                    None => true,
                };

                if !should_check {
                    continue;
                }

                debug!(
                    url = %podcast.url,
                    podcast_id = podcast.id,
                    interval = ?interval,
                    "Checking podcast feed"
                );

                match self.service.check_feed_now(PodcastId::new(podcast.id)).await {
                    Ok(report) => {
                        info!(
                            url = %podcast.url,
                            discovered = report.episodes_discovered,
                            annotated = report.episodes_annotated,
                            "Feed check complete"
                        );
                    }
                    // Manual cycle holds the lock; try again next pass
                    Err(Error::CycleInProgress) => {
                        debug!(url = %podcast.url, "Cycle in progress, deferring feed check");
                        continue;
                    }
                    Err(Error::ShuttingDown) => break,
                    Err(e) => {
                        error!(url = %podcast.url, error = %e, "Feed check failed");
                    }
                }

                last_check_times.insert(podcast.id, now);
            }

            // Brief sleep between passes; keeps the loop responsive to shutdown
            sleep(Duration::from_secs(1)).await;
        }

        info!("Feed poller stopped");
    }
}
