//! Core service facade tying feeds, pipeline, digest, and triggers together.
//!
//! [`PodBrief`] owns the database, the event channel, and the collaborators.
//! It is cheap to clone (all fields are Arc-wrapped) so background tasks and
//! the API share one instance. The feed-check cycle is guarded by a mutex:
//! only one cycle runs at a time, and a trigger arriving mid-cycle gets
//! [`Error::CycleInProgress`] instead of a queue.

use crate::config::{Config, EpisodeFilter};
use crate::db::{Database, InsertPodcastParams, PodcastRow};
use crate::digest::DigestSender;
use crate::error::{Error, Result};
use crate::feeds::FeedWatcher;
use crate::pipeline::{
    Annotator, AudioFetcher, ChatSummarizer, ChatTopicFlagger, HttpTranscriber, Summarizer,
    TopicFlagger, Transcriber,
};
use crate::types::{CycleReport, DigestReport, Event, PodcastId};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, broadcast};
use tracing::{info, warn};

mod background;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

/// Main service instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct PodBrief {
    /// Database instance for persistence
    ///
    /// Public so embedders and the API can query state directly.
    pub db: Arc<Database>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Configuration
    pub(crate) config: Arc<Config>,
    /// Feed fetcher and differ
    pub(crate) watcher: Arc<FeedWatcher>,
    /// Sequential annotation pipeline
    pub(crate) annotator: Arc<Annotator>,
    /// Digest assembly and delivery
    pub(crate) digest: Arc<DigestSender>,
    /// Held for the duration of a feed-check cycle
    cycle_lock: Arc<Mutex<()>>,
    /// Cleared during shutdown; background tasks poll this
    pub(crate) running: Arc<AtomicBool>,
}

impl PodBrief {
    /// Create a new PodBrief instance
    ///
    /// This initializes all core components:
    /// - Opens/creates the SQLite database and runs migrations
    /// - Recovers episodes left mid-pipeline by an unclean shutdown
    /// - Merges config-file feeds and topics into the database
    /// - Sets up the event broadcast channel and the collaborator clients
    pub async fn new(config: Config) -> Result<Self> {
        Self::with_stages(config, None, None, None).await
    }

    /// Create a PodBrief with substitute pipeline stages
    ///
    /// Used by tests to swap the external collaborators for doubles; `None`
    /// falls back to the HTTP implementations built from the config.
    pub async fn with_stages(
        config: Config,
        transcriber: Option<Box<dyn Transcriber>>,
        summarizer: Option<Box<dyn Summarizer>>,
        flagger: Option<Box<dyn TopicFlagger>>,
    ) -> Result<Self> {
        let db = Arc::new(Database::new(&config.persistence.database_path).await?);

        // Episodes stuck mid-pipeline from a previous crash go back to the queue
        if db.was_unclean_shutdown().await? {
            let reset = db.reset_transient_episodes().await?;
            if reset > 0 {
                warn!(
                    reset,
                    "Unclean shutdown detected, returned in-flight episodes to the queue"
                );
            }
        }
        db.set_clean_start().await?;

        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = broadcast::channel(1000);

        merge_config_feeds(&db, &config).await?;
        merge_config_topics(&db, &config).await?;

        let watcher = FeedWatcher::new(
            db.clone(),
            config.feeds.fetch_timeout,
            &config.feeds.user_agent,
        )?;

        let fetcher = AudioFetcher::new(
            config.pipeline.audio_fetch_timeout,
            config.pipeline.max_audio_bytes,
        )?;
        let transcriber: Box<dyn Transcriber> = match transcriber {
            Some(t) => t,
            None => Box::new(HttpTranscriber::new(config.transcription.clone())?),
        };
        let summarizer: Box<dyn Summarizer> = match summarizer {
            Some(s) => s,
            None => Box::new(ChatSummarizer::new(config.summarization.clone())?),
        };
        let flagger: Box<dyn TopicFlagger> = match flagger {
            Some(f) => f,
            None => Box::new(ChatTopicFlagger::new(config.summarization.clone())?),
        };

        let annotator = Annotator::new(
            db.clone(),
            fetcher,
            transcriber,
            summarizer,
            flagger,
            config.pipeline.clone(),
            event_tx.clone(),
        );

        let digest = DigestSender::new(db.clone(), config.digest.clone(), event_tx.clone())?;

        Ok(Self {
            db,
            event_tx,
            config: Arc::new(config),
            watcher: Arc::new(watcher),
            annotator: Arc::new(annotator),
            digest: Arc::new(digest),
            cycle_lock: Arc::new(Mutex::new(())),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Subscribe to service events
    ///
    /// Returns a broadcast receiver; slow subscribers that fall more than
    /// 1000 events behind see `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Whether the service is accepting work (false once shutdown starts)
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Check every enabled feed and annotate whatever turns up
    ///
    /// Runs the full cycle: fetch each feed, diff against seen items, then
    /// one sequential annotation pass over the pending queue.
    ///
    /// # Errors
    /// Returns [`Error::CycleInProgress`] if a cycle is already running and
    /// [`Error::ShuttingDown`] during shutdown.
    pub async fn check_all_feeds_now(&self) -> Result<CycleReport> {
        let podcasts = self.db.get_all_podcasts().await?;
        self.run_cycle(podcasts).await
    }

    /// Check a single feed and annotate whatever turns up
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if the podcast does not exist, plus the
    /// same concurrency errors as [`check_all_feeds_now`](Self::check_all_feeds_now).
    pub async fn check_feed_now(&self, id: PodcastId) -> Result<CycleReport> {
        let podcast = self
            .db
            .get_podcast(id.get())
            .await?
            .ok_or_else(|| Error::NotFound(format!("Podcast {} not found", id)))?;
        self.run_cycle(vec![podcast]).await
    }

    /// Run one feed-check cycle over the given podcasts
    ///
    /// A failed feed is logged and counted; the cycle always continues with
    /// the remaining feeds and then annotates the pending queue.
    async fn run_cycle(&self, podcasts: Vec<PodcastRow>) -> Result<CycleReport> {
        if !self.is_running() {
            return Err(Error::ShuttingDown);
        }

        // A trigger firing mid-cycle is rejected rather than queued
        let _guard = self
            .cycle_lock
            .try_lock()
            .map_err(|_| Error::CycleInProgress)?;

        let _ = self.event_tx.send(Event::CycleStarted);
        let mut report = CycleReport::default();

        for podcast in &podcasts {
            if podcast.enabled == 0 {
                continue;
            }

            let podcast_id = PodcastId::new(podcast.id);
            report.feeds_checked += 1;

            let items = match self.watcher.fetch_feed(&podcast.url).await {
                Ok(items) => items,
                Err(e) => {
                    warn!(url = %podcast.url, error = %e, "Feed check failed");
                    report.feeds_failed += 1;
                    self.db
                        .update_podcast_check_status(podcast.id, Some(&e.to_string()))
                        .await?;
                    let _ = self.event_tx.send(Event::FeedFailed {
                        podcast_id,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let filters = self.filters_for(&podcast.url);
            let total_items = items.len();
            let diff = self
                .watcher
                .diff_feed_items(podcast_id, &filters, items)
                .await?;

            self.db
                .update_podcast_check_status(podcast.id, None)
                .await?;
            let _ = self.event_tx.send(Event::FeedChecked {
                podcast_id,
                items: total_items,
                new_items: diff.discovered.len() + diff.skipped.len(),
            });

            report.episodes_discovered += diff.discovered.len();
            report.episodes_skipped += diff.skipped.len();
            for (id, title) in diff.discovered {
                let _ = self.event_tx.send(Event::EpisodeDiscovered { id, title });
            }
            for (id, _title) in diff.skipped {
                let _ = self.event_tx.send(Event::EpisodeSkipped {
                    id,
                    reason: "no audio enclosure".to_string(),
                });
            }
        }

        let stats = self.annotator.annotate_pending().await?;
        report.episodes_annotated = stats.annotated;
        report.episodes_failed = stats.failed;

        info!(
            feeds_checked = report.feeds_checked,
            feeds_failed = report.feeds_failed,
            discovered = report.episodes_discovered,
            annotated = report.episodes_annotated,
            failed = report.episodes_failed,
            skipped = report.episodes_skipped,
            "Feed-check cycle complete"
        );
        let _ = self.event_tx.send(Event::CycleComplete {
            report: report.clone(),
        });

        Ok(report)
    }

    /// Assemble and send the digest immediately
    ///
    /// Covers everything annotated since the last successful send; an empty
    /// window is logged but sends nothing.
    pub async fn send_digest_now(&self) -> Result<DigestReport> {
        if !self.is_running() {
            return Err(Error::ShuttingDown);
        }
        self.digest.send_digest().await
    }

    /// Add a podcast feed at runtime
    ///
    /// The title defaults to the URL until a nicer one is supplied.
    pub async fn add_podcast(
        &self,
        url: &str,
        title: Option<&str>,
        check_interval_secs: i64,
        enabled: bool,
    ) -> Result<PodcastRow> {
        let id = self
            .db
            .insert_podcast(InsertPodcastParams {
                title: title.unwrap_or(url),
                url,
                check_interval_secs,
                enabled,
            })
            .await?;

        self.db
            .get_podcast(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Podcast {} not found after insert", id)))
    }

    /// Episode filters configured for the given feed URL
    ///
    /// Feeds added via the API have no config entry and therefore no filters.
    fn filters_for(&self, url: &str) -> Vec<EpisodeFilter> {
        self.config
            .feeds
            .podcasts
            .iter()
            .find(|p| p.url == url)
            .map(|p| p.filters.clone())
            .unwrap_or_default()
    }

    /// Gracefully shut down the service
    ///
    /// Stops background tasks from starting new work, marks the shutdown
    /// clean in the database, and emits [`Event::Shutdown`]. An in-flight
    /// cycle is allowed to finish; its episodes stay consistent because every
    /// stage persists before moving on.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Initiating graceful shutdown");

        self.running.store(false, Ordering::SeqCst);

        // Wait for any in-flight cycle to release the lock
        let _guard = self.cycle_lock.lock().await;

        if let Err(e) = self.db.set_clean_shutdown().await {
            tracing::error!(error = %e, "Failed to mark clean shutdown in database");
        }

        let _ = self.event_tx.send(Event::Shutdown);
        info!("Graceful shutdown complete");
        Ok(())
    }
}

/// Insert config-file feeds missing from the database
///
/// Feeds already present keep their stored settings; the config is only a
/// seed, not the source of truth.
async fn merge_config_feeds(db: &Database, config: &Config) -> Result<()> {
    for feed in &config.feeds.podcasts {
        if db.get_podcast_by_url(&feed.url).await?.is_none() {
            let id = db
                .insert_podcast(InsertPodcastParams {
                    title: &feed.url,
                    url: &feed.url,
                    check_interval_secs: feed.check_interval.as_secs() as i64,
                    enabled: feed.enabled,
                })
                .await?;
            info!(podcast_id = id, url = %feed.url, "Added config feed to database");
        }
    }
    Ok(())
}

/// Insert config-file topics missing from the database
async fn merge_config_topics(db: &Database, config: &Config) -> Result<()> {
    for topic in &config.topics {
        if db.get_topic_by_name(&topic.name).await?.is_none() {
            let id = db
                .insert_topic(&topic.name, topic.description.as_deref())
                .await?;
            info!(topic_id = id, name = %topic.name, "Added config topic to database");
        }
    }
    Ok(())
}
