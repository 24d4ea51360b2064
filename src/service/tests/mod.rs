use super::*;
use crate::config::{PersistenceConfig, PipelineConfig, TopicConfig};
use crate::db::TopicRow;
use crate::error::PipelineError;
use crate::types::{EpisodeStatus, TopicFlag};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct StaticTranscriber(String);

#[async_trait]
impl Transcriber for StaticTranscriber {
    async fn transcribe(
        &self,
        _id: crate::types::EpisodeId,
        _audio: Vec<u8>,
        _filename: &str,
    ) -> Result<String> {
        Ok(self.0.clone())
    }
}

struct FailingTranscriber;

#[async_trait]
impl Transcriber for FailingTranscriber {
    async fn transcribe(
        &self,
        id: crate::types::EpisodeId,
        _audio: Vec<u8>,
        _filename: &str,
    ) -> Result<String> {
        Err(PipelineError::TranscriptionFailed {
            id: id.get(),
            reason: "service unavailable".to_string(),
        }
        .into())
    }
}

struct StaticSummarizer(String);

#[async_trait]
impl Summarizer for StaticSummarizer {
    async fn summarize(
        &self,
        _id: crate::types::EpisodeId,
        _title: &str,
        _transcript: &str,
    ) -> Result<String> {
        Ok(self.0.clone())
    }
}

struct StaticFlagger(Vec<TopicFlag>);

#[async_trait]
impl TopicFlagger for StaticFlagger {
    async fn flag(
        &self,
        _id: crate::types::EpisodeId,
        _summary: &str,
        _transcript: &str,
        _topics: &[TopicRow],
    ) -> Result<Vec<TopicFlag>> {
        Ok(self.0.clone())
    }
}

fn temp_db_path() -> PathBuf {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("test.db");
    std::mem::forget(temp_dir);
    path
}

fn test_config(db_path: PathBuf) -> Config {
    Config {
        pipeline: PipelineConfig {
            episode_delay: Duration::from_millis(0),
            ..Default::default()
        },
        persistence: PersistenceConfig {
            database_path: db_path,
            schedule_rules: vec![],
        },
        ..Default::default()
    }
}

async fn test_service(config: Config) -> PodBrief {
    PodBrief::with_stages(
        config,
        Some(Box::new(StaticTranscriber("a transcript".into()))),
        Some(Box::new(StaticSummarizer("a summary".into()))),
        Some(Box::new(StaticFlagger(vec![]))),
    )
    .await
    .expect("Failed to create service")
}

/// Serve a one-item RSS feed with an audio enclosure on the same mock server
async fn mount_feed(server: &MockServer, guid: &str, delay_ms: u64) {
    let feed = format!(
        r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Test Show</title>
    <item>
      <title>Episode {guid}</title>
      <guid>{guid}</guid>
      <enclosure url="{}/audio/{guid}.mp3" type="audio/mpeg" length="3"/>
    </item>
  </channel>
</rss>"#,
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(feed)
                .set_delay(Duration::from_millis(delay_ms)),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/audio/{guid}.mp3")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"abc".to_vec()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_cycle_discovers_and_annotates() {
    let server = MockServer::start().await;
    mount_feed(&server, "ep1", 0).await;

    let service = test_service(test_config(temp_db_path())).await;
    service
        .add_podcast(&format!("{}/feed.xml", server.uri()), None, 3600, true)
        .await
        .unwrap();

    let report = service.check_all_feeds_now().await.unwrap();
    assert_eq!(report.feeds_checked, 1);
    assert_eq!(report.feeds_failed, 0);
    assert_eq!(report.episodes_discovered, 1);
    assert_eq!(report.episodes_annotated, 1);
    assert_eq!(report.episodes_failed, 0);

    let episodes = service.db.list_episodes(None, 10, 0).await.unwrap();
    assert_eq!(episodes.len(), 1);
    assert_eq!(episodes[0].status, EpisodeStatus::Annotated.to_i32());
    assert_eq!(episodes[0].transcript.as_deref(), Some("a transcript"));
    assert_eq!(episodes[0].summary.as_deref(), Some("a summary"));

    // Second cycle finds nothing new
    let report = service.check_all_feeds_now().await.unwrap();
    assert_eq!(report.episodes_discovered, 0);
    assert_eq!(report.episodes_annotated, 0);
}

#[tokio::test]
async fn test_failed_stage_counts_in_report() {
    let server = MockServer::start().await;
    mount_feed(&server, "ep1", 0).await;

    let service = PodBrief::with_stages(
        test_config(temp_db_path()),
        Some(Box::new(FailingTranscriber)),
        Some(Box::new(StaticSummarizer("unused".into()))),
        Some(Box::new(StaticFlagger(vec![]))),
    )
    .await
    .unwrap();

    service
        .add_podcast(&format!("{}/feed.xml", server.uri()), None, 3600, true)
        .await
        .unwrap();

    let report = service.check_all_feeds_now().await.unwrap();
    assert_eq!(report.episodes_discovered, 1);
    assert_eq!(report.episodes_annotated, 0);
    assert_eq!(report.episodes_failed, 1);

    let episodes = service.db.list_episodes(None, 10, 0).await.unwrap();
    assert_eq!(episodes[0].status, EpisodeStatus::Failed.to_i32());
    assert!(
        episodes[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("service unavailable")
    );
}

#[tokio::test]
async fn test_failed_feed_does_not_stop_cycle() {
    let server = MockServer::start().await;
    mount_feed(&server, "ep1", 0).await;

    let service = test_service(test_config(temp_db_path())).await;
    // Dead feed first so the cycle must continue past it
    service
        .add_podcast("http://127.0.0.1:1/feed.xml", None, 3600, true)
        .await
        .unwrap();
    service
        .add_podcast(&format!("{}/feed.xml", server.uri()), None, 3600, true)
        .await
        .unwrap();

    let report = service.check_all_feeds_now().await.unwrap();
    assert_eq!(report.feeds_checked, 2);
    assert_eq!(report.feeds_failed, 1);
    assert_eq!(report.episodes_discovered, 1);

    // The failure is recorded on the podcast row
    let podcasts = service.db.get_all_podcasts().await.unwrap();
    assert!(podcasts[0].last_error.is_some());
    assert!(podcasts[1].last_error.is_none());
}

#[tokio::test]
async fn test_disabled_feed_is_not_checked() {
    let service = test_service(test_config(temp_db_path())).await;
    service
        .add_podcast("http://127.0.0.1:1/feed.xml", None, 3600, false)
        .await
        .unwrap();

    let report = service.check_all_feeds_now().await.unwrap();
    assert_eq!(report.feeds_checked, 0);
    assert_eq!(report.feeds_failed, 0);
}

#[tokio::test]
async fn test_concurrent_cycle_is_rejected() {
    let server = MockServer::start().await;
    mount_feed(&server, "ep1", 500).await;

    let service = test_service(test_config(temp_db_path())).await;
    service
        .add_podcast(&format!("{}/feed.xml", server.uri()), None, 3600, true)
        .await
        .unwrap();

    let background = service.clone();
    let handle = tokio::spawn(async move { background.check_all_feeds_now().await });

    // Give the first cycle time to take the lock (it is stuck in the slow fetch)
    tokio::time::sleep(Duration::from_millis(100)).await;
    let result = service.check_all_feeds_now().await;
    assert!(matches!(result, Err(Error::CycleInProgress)));

    let first = handle.await.unwrap().unwrap();
    assert_eq!(first.episodes_discovered, 1);
}

#[tokio::test]
async fn test_check_unknown_feed_is_not_found() {
    let service = test_service(test_config(temp_db_path())).await;
    let result = service.check_feed_now(PodcastId::new(99)).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_shutdown_rejects_work_and_marks_clean() {
    let service = test_service(test_config(temp_db_path())).await;
    let mut events = service.subscribe();

    service.shutdown().await.unwrap();
    assert!(!service.is_running());
    assert!(matches!(
        service.check_all_feeds_now().await,
        Err(Error::ShuttingDown)
    ));
    assert!(matches!(
        service.send_digest_now().await,
        Err(Error::ShuttingDown)
    ));

    assert!(matches!(events.try_recv().unwrap(), Event::Shutdown));
    assert!(!service.db.was_unclean_shutdown().await.unwrap());
}

#[tokio::test]
async fn test_unclean_shutdown_resets_in_flight_episodes() {
    let db_path = temp_db_path();

    {
        let service = test_service(test_config(db_path.clone())).await;
        let podcast = service
            .add_podcast("https://example.com/feed.xml", None, 3600, true)
            .await
            .unwrap();
        let id = service
            .db
            .insert_episode(&crate::db::NewEpisode {
                podcast_id: PodcastId::new(podcast.id),
                guid: "ep1".into(),
                title: "Episode 1".into(),
                description: None,
                audio_url: Some("https://example.com/ep1.mp3".into()),
                audio_bytes: None,
                published_at: None,
            })
            .await
            .unwrap();
        service
            .db
            .set_episode_status(id, EpisodeStatus::Transcribing)
            .await
            .unwrap();
        // Dropped without shutdown(); clean_shutdown stays false
    }

    let service = test_service(test_config(db_path)).await;
    let episodes = service.db.list_episodes(None, 10, 0).await.unwrap();
    assert_eq!(episodes[0].status, EpisodeStatus::Discovered.to_i32());
}

#[tokio::test]
async fn test_config_feeds_and_topics_merge_once() {
    let db_path = temp_db_path();
    let mut config = test_config(db_path.clone());
    config.feeds.podcasts = vec![crate::config::PodcastFeedConfig {
        url: "https://example.com/show.xml".into(),
        check_interval: Duration::from_secs(1800),
        filters: vec![],
        enabled: true,
    }];
    config.topics = vec![TopicConfig {
        name: "rust".into(),
        description: Some("The programming language".into()),
    }];

    {
        let service = test_service(config.clone()).await;
        service.shutdown().await.unwrap();
    }
    // Second startup against the same database must not duplicate
    let service = test_service(config).await;

    let podcasts = service.db.get_all_podcasts().await.unwrap();
    assert_eq!(podcasts.len(), 1);
    assert_eq!(podcasts[0].check_interval_secs, 1800);

    let topics = service.db.get_all_topics().await.unwrap();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].name, "rust");
}
