use super::*;
use crate::config::{SummarizationConfig, TranscriptionConfig};
use crate::db::{InsertPodcastParams, NewEpisode, TopicRow};
use crate::types::{PodcastId, TopicFlag};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn create_test_db() -> Arc<Database> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    std::mem::forget(temp_dir);
    Arc::new(db)
}

async fn insert_discovered_episode(db: &Database, guid: &str, audio_url: Option<&str>) -> EpisodeId {
    let podcast_id = match db.get_podcast_by_url("https://example.com/show.xml").await.unwrap() {
        Some(p) => p.id,
        None => db
            .insert_podcast(InsertPodcastParams {
                title: "Show",
                url: "https://example.com/show.xml",
                check_interval_secs: 3600,
                enabled: true,
            })
            .await
            .unwrap(),
    };

    db.insert_episode(&NewEpisode {
        podcast_id: PodcastId::new(podcast_id),
        guid: guid.to_string(),
        title: format!("Episode {}", guid),
        description: None,
        audio_url: audio_url.map(|u| u.to_string()),
        audio_bytes: None,
        published_at: Some(100),
    })
    .await
    .unwrap()
}

/// Stage doubles that record calls and return canned results

struct StaticTranscriber {
    text: String,
    calls: Mutex<Vec<EpisodeId>>,
}

#[async_trait]
impl Transcriber for StaticTranscriber {
    async fn transcribe(&self, id: EpisodeId, _audio: Vec<u8>, _filename: &str) -> Result<String> {
        self.calls.lock().unwrap().push(id);
        Ok(self.text.clone())
    }
}

struct FailingTranscriber;

#[async_trait]
impl Transcriber for FailingTranscriber {
    async fn transcribe(&self, id: EpisodeId, _audio: Vec<u8>, _filename: &str) -> Result<String> {
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
    async fn summarize(&self, _id: EpisodeId, _title: &str, _transcript: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

struct StaticFlagger(Vec<TopicFlag>);

#[async_trait]
impl TopicFlagger for StaticFlagger {
    async fn flag(
        &self,
        _id: EpisodeId,
        _summary: &str,
        _transcript: &str,
        _topics: &[TopicRow],
    ) -> Result<Vec<TopicFlag>> {
        Ok(self.0.clone())
    }
}

fn test_config() -> PipelineConfig {
    PipelineConfig {
        episode_delay: Duration::from_millis(0),
        max_episodes_per_cycle: 10,
        max_audio_bytes: 10 * 1024 * 1024,
        audio_fetch_timeout: Duration::from_secs(5),
    }
}

async fn mount_audio(server: &MockServer, route: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

fn build_annotator(
    db: Arc<Database>,
    transcriber: Box<dyn Transcriber>,
    flags: Vec<TopicFlag>,
) -> (Annotator, broadcast::Receiver<Event>) {
    let (tx, rx) = broadcast::channel(64);
    let annotator = Annotator::new(
        db,
        AudioFetcher::new(Duration::from_secs(5), 10 * 1024 * 1024).unwrap(),
        transcriber,
        Box::new(StaticSummarizer("a fine summary".to_string())),
        Box::new(StaticFlagger(flags)),
        test_config(),
        tx,
    );
    (annotator, rx)
}

#[tokio::test]
async fn test_annotate_pending_full_run() {
    let db = create_test_db().await;
    let mock_server = MockServer::start().await;
    mount_audio(&mock_server, "/ep1.mp3", b"fake mp3 bytes").await;

    let url = format!("{}/ep1.mp3", mock_server.uri());
    let id = insert_discovered_episode(&db, "ep1", Some(&url)).await;

    let topic_id = db.insert_topic("rust", None).await.unwrap();
    let flags = vec![TopicFlag {
        topic: "rust".to_string(),
        relevant: true,
        reason: Some("on topic".to_string()),
    }];

    let transcriber = Box::new(StaticTranscriber {
        text: "the transcript".to_string(),
        calls: Mutex::new(vec![]),
    });
    let (annotator, _rx) = build_annotator(db.clone(), transcriber, flags);

    let stats = annotator.annotate_pending().await.unwrap();
    assert_eq!(stats.annotated, 1);
    assert_eq!(stats.failed, 0);

    let episode = db.get_episode(id).await.unwrap().unwrap();
    assert_eq!(episode.status, EpisodeStatus::Annotated.to_i32());
    assert_eq!(episode.transcript.as_deref(), Some("the transcript"));
    assert_eq!(episode.summary.as_deref(), Some("a fine summary"));

    let stored_flags = db.get_topic_flags(id).await.unwrap();
    assert_eq!(stored_flags.len(), 1);
    assert_eq!(stored_flags[0].topic_id, topic_id);
    assert_eq!(stored_flags[0].relevant, 1);
}

#[tokio::test]
async fn test_failed_stage_marks_episode_and_continues() {
    let db = create_test_db().await;
    let mock_server = MockServer::start().await;
    mount_audio(&mock_server, "/a.mp3", b"audio a").await;
    mount_audio(&mock_server, "/b.mp3", b"audio b").await;

    let url_a = format!("{}/a.mp3", mock_server.uri());
    let url_b = format!("{}/b.mp3", mock_server.uri());
    let first = insert_discovered_episode(&db, "a", Some(&url_a)).await;
    let second = insert_discovered_episode(&db, "b", Some(&url_b)).await;

    let (annotator, _rx) = build_annotator(db.clone(), Box::new(FailingTranscriber), vec![]);

    let stats = annotator.annotate_pending().await.unwrap();
    // Both episodes were attempted; neither aborted the pass
    assert_eq!(stats.annotated, 0);
    assert_eq!(stats.failed, 2);

    for id in [first, second] {
        let episode = db.get_episode(id).await.unwrap().unwrap();
        assert_eq!(episode.status, EpisodeStatus::Failed.to_i32());
        assert!(episode
            .error_message
            .as_deref()
            .unwrap()
            .contains("service unavailable"));
    }
}

#[tokio::test]
async fn test_cycle_cap_leaves_rest_discovered() {
    let db = create_test_db().await;
    let mock_server = MockServer::start().await;
    mount_audio(&mock_server, "/a.mp3", b"audio").await;

    let url = format!("{}/a.mp3", mock_server.uri());
    for guid in ["a", "b", "c"] {
        insert_discovered_episode(&db, guid, Some(&url)).await;
    }

    let transcriber = Box::new(StaticTranscriber {
        text: "t".to_string(),
        calls: Mutex::new(vec![]),
    });
    let (tx, _rx) = broadcast::channel(64);
    let annotator = Annotator::new(
        db.clone(),
        AudioFetcher::new(Duration::from_secs(5), 1024 * 1024).unwrap(),
        transcriber,
        Box::new(StaticSummarizer("s".to_string())),
        Box::new(StaticFlagger(vec![])),
        PipelineConfig {
            max_episodes_per_cycle: 2,
            ..test_config()
        },
        tx,
    );

    let stats = annotator.annotate_pending().await.unwrap();
    assert_eq!(stats.annotated, 2);

    let remaining = db.get_pending_episodes(10).await.unwrap();
    assert_eq!(remaining.len(), 1);
}

#[tokio::test]
async fn test_annotation_events_are_broadcast() {
    let db = create_test_db().await;
    let mock_server = MockServer::start().await;
    mount_audio(&mock_server, "/a.mp3", b"audio").await;

    let url = format!("{}/a.mp3", mock_server.uri());
    let id = insert_discovered_episode(&db, "a", Some(&url)).await;

    let transcriber = Box::new(StaticTranscriber {
        text: "t".to_string(),
        calls: Mutex::new(vec![]),
    });
    let (annotator, mut rx) = build_annotator(db, transcriber, vec![]);

    annotator.annotate_pending().await.unwrap();

    let mut stages = Vec::new();
    let mut annotated = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            Event::StageStarted { id: event_id, status } => {
                assert_eq!(event_id, id);
                stages.push(status);
            }
            Event::EpisodeAnnotated { id: event_id, .. } => {
                assert_eq!(event_id, id);
                annotated = true;
            }
            _ => {}
        }
    }

    assert_eq!(
        stages,
        vec![
            EpisodeStatus::Fetching,
            EpisodeStatus::Transcribing,
            EpisodeStatus::Summarizing,
            EpisodeStatus::Flagging,
        ]
    );
    assert!(annotated);
}

#[tokio::test]
async fn test_audio_fetcher_rejects_oversized_body() {
    let mock_server = MockServer::start().await;
    mount_audio(&mock_server, "/big.mp3", &[0u8; 4096]).await;

    let fetcher = AudioFetcher::new(Duration::from_secs(5), 1024).unwrap();
    let url = format!("{}/big.mp3", mock_server.uri());
    let result = fetcher.fetch(EpisodeId::new(1), &url).await;

    match result {
        Err(crate::Error::Pipeline(PipelineError::AudioTooLarge { limit_bytes, .. })) => {
            assert_eq!(limit_bytes, 1024);
        }
        other => panic!("expected AudioTooLarge, got {:?}", other.map(|b| b.len())),
    }
}

#[tokio::test]
async fn test_audio_fetcher_non_success_status() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone.mp3"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let fetcher = AudioFetcher::new(Duration::from_secs(5), 1024).unwrap();
    let url = format!("{}/gone.mp3", mock_server.uri());
    let result = fetcher.fetch(EpisodeId::new(1), &url).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_http_transcriber_round_trip() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "hello world"})),
        )
        .mount(&mock_server)
        .await;

    let transcriber = HttpTranscriber::new(TranscriptionConfig {
        endpoint: format!("{}/v1/audio/transcriptions", mock_server.uri()),
        api_key: Some("test-key".to_string()),
        model: "whisper-1".to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap();

    let text = transcriber
        .transcribe(EpisodeId::new(1), b"bytes".to_vec(), "ep.mp3")
        .await
        .unwrap();
    assert_eq!(text, "hello world");
}

#[tokio::test]
async fn test_http_transcriber_propagates_service_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&mock_server)
        .await;

    let transcriber = HttpTranscriber::new(TranscriptionConfig {
        endpoint: format!("{}/v1/audio/transcriptions", mock_server.uri()),
        api_key: None,
        model: "whisper-1".to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap();

    let result = transcriber
        .transcribe(EpisodeId::new(7), b"bytes".to_vec(), "ep.mp3")
        .await;

    match result {
        Err(crate::Error::Pipeline(PipelineError::TranscriptionFailed { id, reason })) => {
            assert_eq!(id, 7);
            assert!(reason.contains("500"));
            assert!(reason.contains("overloaded"));
        }
        other => panic!("expected TranscriptionFailed, got {:?}", other),
    }
}

fn completion_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
}

#[tokio::test]
async fn test_chat_summarizer_round_trip() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(serde_json::json!({"model": "gpt-4o-mini"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion_body("  a tidy summary\n")),
        )
        .mount(&mock_server)
        .await;

    let summarizer = ChatSummarizer::new(SummarizationConfig {
        endpoint: format!("{}/v1/chat/completions", mock_server.uri()),
        api_key: None,
        model: "gpt-4o-mini".to_string(),
        timeout: Duration::from_secs(5),
        max_prompt_chars: 1000,
    })
    .unwrap();

    let summary = summarizer
        .summarize(EpisodeId::new(1), "Episode 1", "long transcript")
        .await
        .unwrap();
    assert_eq!(summary, "a tidy summary");
}

#[tokio::test]
async fn test_chat_flagger_parses_model_output() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            r#"[{"topic": "rust", "relevant": true, "reason": "crates discussed"},
                {"topic": "cooking", "relevant": false}]"#,
        )))
        .mount(&mock_server)
        .await;

    let flagger = ChatTopicFlagger::new(SummarizationConfig {
        endpoint: format!("{}/v1/chat/completions", mock_server.uri()),
        api_key: None,
        model: "gpt-4o-mini".to_string(),
        timeout: Duration::from_secs(5),
        max_prompt_chars: 1000,
    })
    .unwrap();

    let topics = vec![
        TopicRow {
            id: 1,
            name: "rust".to_string(),
            description: None,
            created_at: 0,
        },
        TopicRow {
            id: 2,
            name: "cooking".to_string(),
            description: Some("recipes".to_string()),
            created_at: 0,
        },
    ];

    let flags = flagger
        .flag(EpisodeId::new(1), "summary", "transcript", &topics)
        .await
        .unwrap();

    assert_eq!(flags.len(), 2);
    assert!(flags[0].relevant);
    assert!(!flags[1].relevant);
}

#[tokio::test]
async fn test_chat_flagger_no_topics_skips_request() {
    // No mock server mounted: a request would fail, proving none is made
    let flagger = ChatTopicFlagger::new(SummarizationConfig {
        endpoint: "http://127.0.0.1:1/v1/chat/completions".to_string(),
        api_key: None,
        model: "gpt-4o-mini".to_string(),
        timeout: Duration::from_secs(1),
        max_prompt_chars: 1000,
    })
    .unwrap();

    let flags = flagger
        .flag(EpisodeId::new(1), "summary", "transcript", &[])
        .await
        .unwrap();
    assert!(flags.is_empty());
}

#[test]
fn test_audio_filename_from_url() {
    assert_eq!(audio_filename("https://x.com/a/b/ep.mp3"), "ep.mp3");
    assert_eq!(audio_filename("https://x.com/ep.m4a?token=abc"), "ep.m4a");
    assert_eq!(audio_filename("https://x.com/"), "episode.mp3");
}
