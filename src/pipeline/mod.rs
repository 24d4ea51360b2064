//! Episode annotation pipeline.
//!
//! Each discovered episode moves through a strictly sequential call chain:
//! fetch audio, transcribe, summarize, flag topics, persist. Stages are trait
//! seams ([`Transcriber`], [`Summarizer`], [`TopicFlagger`]) so tests can
//! substitute the external collaborators.
//!
//! Error policy is deliberately blunt: a stage failure marks the episode
//! failed, logs it, and the cycle moves on to the next episode. There is no
//! retry and no automatic reprocessing of failed episodes.

use crate::config::PipelineConfig;
use crate::db::{Database, EpisodeRow};
use crate::error::{PipelineError, Result};
use crate::types::{EpisodeId, EpisodeStatus, Event};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

mod audio;
mod summarize;
mod topics;
mod transcribe;

pub use audio::AudioFetcher;
pub use summarize::{ChatSummarizer, Summarizer};
pub use topics::{ChatTopicFlagger, TopicFlagger};
pub use transcribe::{HttpTranscriber, Transcriber};

/// Counters from one annotation pass
#[derive(Debug, Default, Clone, Copy)]
pub struct AnnotateStats {
    /// Episodes fully annotated
    pub annotated: usize,
    /// Episodes that failed a stage
    pub failed: usize,
}

/// Runs the sequential annotation pipeline over pending episodes
pub struct Annotator {
    db: Arc<Database>,
    fetcher: AudioFetcher,
    transcriber: Box<dyn Transcriber>,
    summarizer: Box<dyn Summarizer>,
    flagger: Box<dyn TopicFlagger>,
    config: PipelineConfig,
    events: broadcast::Sender<Event>,
}

impl Annotator {
    /// Create a new annotator over the given stage implementations
    pub fn new(
        db: Arc<Database>,
        fetcher: AudioFetcher,
        transcriber: Box<dyn Transcriber>,
        summarizer: Box<dyn Summarizer>,
        flagger: Box<dyn TopicFlagger>,
        config: PipelineConfig,
        events: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            db,
            fetcher,
            transcriber,
            summarizer,
            flagger,
            config,
            events,
        }
    }

    /// Annotate pending episodes, oldest publication first
    ///
    /// Processes at most `max_episodes_per_cycle` episodes, waiting
    /// `episode_delay` between them. A stage failure is recorded on the
    /// episode and the pass continues with the next one.
    pub async fn annotate_pending(&self) -> Result<AnnotateStats> {
        let pending = self
            .db
            .get_pending_episodes(self.config.max_episodes_per_cycle as i64)
            .await?;

        if pending.is_empty() {
            debug!("No pending episodes to annotate");
            return Ok(AnnotateStats::default());
        }

        info!(count = pending.len(), "Annotating pending episodes");
        let mut stats = AnnotateStats::default();

        for (index, episode) in pending.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.episode_delay).await;
            }

            let id = EpisodeId::new(episode.id);
            match self.annotate_episode(episode).await {
                Ok(relevant_topics) => {
                    stats.annotated += 1;
                    let _ = self.events.send(Event::EpisodeAnnotated {
                        id,
                        relevant_topics,
                    });
                }
                Err(e) => {
                    warn!(episode_id = %id, error = %e, "Episode annotation failed");
                    stats.failed += 1;
                    self.db.set_episode_failed(id, &e.to_string()).await?;
                    let _ = self.events.send(Event::EpisodeFailed {
                        id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            annotated = stats.annotated,
            failed = stats.failed,
            "Annotation pass complete"
        );
        Ok(stats)
    }

    /// Run one episode through every stage, returning the relevant-topic count
    async fn annotate_episode(&self, episode: &EpisodeRow) -> Result<usize> {
        let id = EpisodeId::new(episode.id);

        let audio_url = episode
            .audio_url
            .as_deref()
            .ok_or(PipelineError::NoAudio { id: episode.id })?;

        // Stage 1: fetch audio
        self.enter_stage(id, EpisodeStatus::Fetching).await?;
        let audio = self.fetcher.fetch(id, audio_url).await?;

        // Stage 2: transcribe
        self.enter_stage(id, EpisodeStatus::Transcribing).await?;
        let filename = audio_filename(audio_url);
        let transcript = self.transcriber.transcribe(id, audio, &filename).await?;
        self.db.set_episode_transcript(id, &transcript).await?;

        // Stage 3: summarize
        self.enter_stage(id, EpisodeStatus::Summarizing).await?;
        let summary = self
            .summarizer
            .summarize(id, &episode.title, &transcript)
            .await?;
        self.db.set_episode_summary(id, &summary).await?;

        // Stage 4: flag topics
        self.enter_stage(id, EpisodeStatus::Flagging).await?;
        let topics = self.db.get_all_topics().await?;
        let mut relevant_count = 0;
        if !topics.is_empty() {
            let flags = self.flagger.flag(id, &summary, &transcript, &topics).await?;
            for flag in &flags {
                // flag() only returns known topics, but the list can change under us
                let topic = topics
                    .iter()
                    .find(|t| t.name.eq_ignore_ascii_case(&flag.topic));
                if let Some(topic) = topic {
                    self.db
                        .insert_topic_flag(id, topic.id, flag.relevant, flag.reason.as_deref())
                        .await?;
                    if flag.relevant {
                        relevant_count += 1;
                    }
                }
            }
        }

        // Stage 5: persist final state
        self.db.set_episode_annotated(id).await?;
        info!(episode_id = %id, title = %episode.title, "Episode annotated");

        Ok(relevant_count)
    }

    /// Record a stage transition and broadcast it
    async fn enter_stage(&self, id: EpisodeId, status: EpisodeStatus) -> Result<()> {
        self.db.set_episode_status(id, status).await?;
        let _ = self.events.send(Event::StageStarted { id, status });
        Ok(())
    }
}

/// Derive an upload filename from the audio URL path
fn audio_filename(url: &str) -> String {
    url.rsplit('/')
        .next()
        .map(|name| name.split('?').next().unwrap_or(name))
        .filter(|name| !name.is_empty())
        .unwrap_or("episode.mp3")
        .to_string()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
