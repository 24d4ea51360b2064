use super::*;
use crate::db::{InsertPodcastParams, NewEpisode};
use crate::types::PodcastId;
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

async fn insert_annotated_episode(db: &Database, guid: &str, summary: &str) {
    let podcast_id = match db
        .get_podcast_by_url("https://example.com/show.xml")
        .await
        .unwrap()
    {
        Some(p) => p.id,
        None => db
            .insert_podcast(InsertPodcastParams {
                title: "The Show",
                url: "https://example.com/show.xml",
                check_interval_secs: 3600,
                enabled: true,
            })
            .await
            .unwrap(),
    };

    let id = db
        .insert_episode(&NewEpisode {
            podcast_id: PodcastId::new(podcast_id),
            guid: guid.to_string(),
            title: format!("Episode {}", guid),
            description: None,
            audio_url: None,
            audio_bytes: None,
            published_at: None,
        })
        .await
        .unwrap();

    db.set_episode_summary(id, summary).await.unwrap();
    db.set_episode_annotated(id).await.unwrap();
}

fn test_config(relay_url: Option<String>) -> DigestConfig {
    DigestConfig {
        relay_url,
        relay_api_key: Some("relay-key".to_string()),
        from: "digest@example.com".to_string(),
        recipients: vec!["reader@example.com".to_string()],
        subject_prefix: "Podcast brief".to_string(),
        relay_timeout: Duration::from_secs(5),
    }
}

fn sample_rows() -> Vec<DigestEpisodeRow> {
    vec![
        DigestEpisodeRow {
            id: 1,
            podcast_title: "The Show".to_string(),
            title: "Episode one".to_string(),
            summary: Some("First summary".to_string()),
            annotated_at: Some(1_700_000_000),
        },
        DigestEpisodeRow {
            id: 2,
            podcast_title: "The Show".to_string(),
            title: "Episode <two>".to_string(),
            summary: None,
            annotated_at: None,
        },
    ]
}

#[test]
fn test_render_text_includes_all_episodes() {
    let text = render_text(&sample_rows());
    assert!(text.starts_with("2 new episode(s) annotated:"));
    assert!(text.contains("The Show — Episode one"));
    assert!(text.contains("First summary"));
    assert!(text.contains("(no summary)"));
}

#[test]
fn test_render_html_escapes_content() {
    let html = render_html(&sample_rows());
    assert!(html.contains("Episode &lt;two&gt;"));
    assert!(!html.contains("Episode <two>"));
    assert!(html.starts_with("<html>"));
}

#[tokio::test]
async fn test_empty_window_logs_without_sending() {
    let db = create_test_db().await;

    // Relay URL points nowhere; an attempted send would error
    let (tx, mut rx) = broadcast::channel(16);
    let sender = DigestSender::new(
        db.clone(),
        test_config(Some("http://127.0.0.1:1/send".to_string())),
        tx,
    )
    .unwrap();

    let report = sender.send_digest().await.unwrap();
    assert_eq!(report.episodes, 0);
    assert!(!report.sent);

    // Nothing was mailed, so no DigestSent event goes out
    assert!(matches!(
        rx.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));

    // The empty window is still logged and advances the window
    let log = db.get_digest_log(10).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].sent, 1);
    assert_eq!(log[0].episode_count, 0);
}

#[tokio::test]
async fn test_digest_posts_payload_and_logs_success() {
    let db = create_test_db().await;
    insert_annotated_episode(&db, "a", "summary a").await;
    insert_annotated_episode(&db, "b", "summary b").await;

    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .and(header("Authorization", "Bearer relay-key"))
        .and(body_partial_json(serde_json::json!({
            "from": "digest@example.com",
            "to": ["reader@example.com"],
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (tx, mut rx) = broadcast::channel(16);
    let sender = DigestSender::new(
        db.clone(),
        test_config(Some(format!("{}/send", mock_server.uri()))),
        tx,
    )
    .unwrap();

    let report = sender.send_digest().await.unwrap();
    assert_eq!(report.episodes, 2);
    assert!(report.sent);

    match rx.try_recv().unwrap() {
        Event::DigestSent { report } => assert_eq!(report.episodes, 2),
        other => panic!("expected DigestSent, got {:?}", other),
    }

    let log = db.get_digest_log(10).await.unwrap();
    assert_eq!(log[0].sent, 1);
    assert_eq!(log[0].episode_count, 2);
}

#[tokio::test]
async fn test_failed_relay_keeps_window_open() {
    let db = create_test_db().await;
    insert_annotated_episode(&db, "a", "summary a").await;

    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(500).set_body_string("relay exploded"))
        .mount(&mock_server)
        .await;

    let (tx, _rx) = broadcast::channel(16);
    let sender = DigestSender::new(
        db.clone(),
        test_config(Some(format!("{}/send", mock_server.uri()))),
        tx,
    )
    .unwrap();

    let result = sender.send_digest().await;
    assert!(result.is_err());

    let log = db.get_digest_log(10).await.unwrap();
    assert_eq!(log[0].sent, 0);
    assert!(log[0].error.as_deref().unwrap().contains("500"));

    // No successful send recorded, so the window lower bound is unchanged
    assert!(db.last_successful_digest().await.unwrap().is_none());
}

#[tokio::test]
async fn test_episodes_without_relay_is_an_error() {
    let db = create_test_db().await;
    insert_annotated_episode(&db, "a", "summary a").await;

    let (tx, _rx) = broadcast::channel(16);
    let sender = DigestSender::new(db.clone(), test_config(None), tx).unwrap();

    let result = sender.send_digest().await;
    assert!(result.is_err());

    let log = db.get_digest_log(10).await.unwrap();
    assert_eq!(log[0].sent, 0);
}
