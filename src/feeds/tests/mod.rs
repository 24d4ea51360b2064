use super::*;
use crate::db::InsertPodcastParams;
use std::time::Duration;
use tempfile::tempdir;

async fn create_test_db() -> Arc<Database> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");

    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");

    // Prevent temp_dir from being dropped (keep it alive for the test)
    std::mem::forget(temp_dir);

    Arc::new(db)
}

async fn create_watcher() -> (FeedWatcher, Arc<Database>) {
    let db = create_test_db().await;
    let watcher = FeedWatcher::new(db.clone(), Duration::from_secs(30), "podbrief test")
        .expect("Failed to create watcher");
    (watcher, db)
}

async fn insert_test_podcast(db: &Database) -> PodcastId {
    let id = db
        .insert_podcast(InsertPodcastParams {
            title: "Test Show",
            url: "https://example.com/feed.xml",
            check_interval_secs: 3600,
            enabled: true,
        })
        .await
        .unwrap();
    PodcastId::new(id)
}

#[test]
fn test_parse_rss_feed() {
    let rss_content = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
    <channel>
        <title>Test Podcast</title>
        <link>https://example.com</link>
        <description>A test podcast</description>
        <item>
            <title>Episode 42: Interview</title>
            <link>https://example.com/episodes/42</link>
            <guid>ep-42</guid>
            <pubDate>Mon, 01 Jan 2024 12:00:00 +0000</pubDate>
            <description>A long conversation</description>
            <enclosure url="https://example.com/audio/42.mp3" length="52428800" type="audio/mpeg"/>
        </item>
        <item>
            <title>Episode 43: Notes only</title>
            <guid>ep-43</guid>
            <pubDate>Tue, 02 Jan 2024 14:30:00 +0000</pubDate>
        </item>
    </channel>
</rss>"#;

    let items = FeedWatcher::parse_as_rss(rss_content).expect("Failed to parse RSS");

    assert_eq!(items.len(), 2, "Should parse 2 items");

    // First item has a full audio enclosure
    assert_eq!(items[0].title, "Episode 42: Interview");
    assert_eq!(items[0].guid, "ep-42");
    assert!(items[0].pub_date.is_some());
    assert_eq!(items[0].description, Some("A long conversation".to_string()));
    assert_eq!(
        items[0].audio_url,
        Some("https://example.com/audio/42.mp3".to_string())
    );
    assert_eq!(items[0].audio_bytes, Some(52428800));

    // Second item has no enclosure
    assert_eq!(items[1].title, "Episode 43: Notes only");
    assert_eq!(items[1].guid, "ep-43");
    assert!(items[1].audio_url.is_none());
}

#[test]
fn test_rss_guid_falls_back_to_enclosure_url() {
    let rss_content = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
    <channel>
        <title>Test Podcast</title>
        <link>https://example.com</link>
        <description>desc</description>
        <item>
            <title>No guid here</title>
            <enclosure url="https://example.com/audio/x.mp3" length="1" type="audio/mpeg"/>
        </item>
        <item>
            <title>Nothing but a title</title>
        </item>
    </channel>
</rss>"#;

    let items = FeedWatcher::parse_as_rss(rss_content).unwrap();
    assert_eq!(items[0].guid, "https://example.com/audio/x.mp3");
    assert_eq!(items[1].guid, "Nothing but a title");
}

#[test]
fn test_rss_non_audio_enclosure_ignored() {
    let rss_content = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
    <channel>
        <title>Test Podcast</title>
        <link>https://example.com</link>
        <description>desc</description>
        <item>
            <title>Video episode</title>
            <guid>ep-1</guid>
            <enclosure url="https://example.com/video/1.mp4" length="1" type="video/mp4"/>
        </item>
    </channel>
</rss>"#;

    let items = FeedWatcher::parse_as_rss(rss_content).unwrap();
    assert!(items[0].audio_url.is_none());
}

#[test]
fn test_parse_atom_feed() {
    let atom_content = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
    <title>Test Atom Podcast</title>
    <id>https://example.com/atom</id>
    <updated>2024-01-01T12:00:00Z</updated>
    <entry>
        <title>Atom Episode 1</title>
        <id>entry-1</id>
        <updated>2024-01-01T12:00:00Z</updated>
        <published>2024-01-01T10:00:00Z</published>
        <summary>An atom episode</summary>
        <link href="https://example.com/audio/1.mp3" rel="enclosure" type="audio/mpeg" length="1048576"/>
    </entry>
    <entry>
        <title>Atom Episode 2</title>
        <id>entry-2</id>
        <updated>2024-01-02T14:30:00Z</updated>
        <link href="https://example.com/details/2" rel="alternate"/>
    </entry>
</feed>"#;

    let items = FeedWatcher::parse_as_atom(atom_content).expect("Failed to parse Atom");

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "Atom Episode 1");
    assert_eq!(items[0].guid, "entry-1");
    assert_eq!(
        items[0].audio_url,
        Some("https://example.com/audio/1.mp3".to_string())
    );
    assert_eq!(items[0].audio_bytes, Some(1048576));
    assert_eq!(items[0].description, Some("An atom episode".to_string()));

    assert_eq!(items[1].guid, "entry-2");
    assert!(items[1].audio_url.is_none());
}

#[test]
fn test_unparsable_content_fails_both_parsers() {
    let result = FeedWatcher::parse_as_rss("not xml at all");
    assert!(result.is_err());
    let result = FeedWatcher::parse_as_atom("not xml at all");
    assert!(result.is_err());
}

#[test]
fn test_filter_include_exclude() {
    let item = FeedItem {
        title: "Deep Dive Interview with a Guest".to_string(),
        link: None,
        guid: "g".to_string(),
        pub_date: None,
        description: Some("A rerun of our favorite talk".to_string()),
        audio_url: None,
        audio_bytes: None,
    };

    let include_only = EpisodeFilter {
        name: "interviews".to_string(),
        include: vec!["(?i)interview".to_string()],
        exclude: vec![],
        max_age: None,
    };
    assert!(FeedWatcher::matches_filter(&item, &include_only));

    // Exclude overrides include; description is part of the search text
    let with_exclude = EpisodeFilter {
        name: "no reruns".to_string(),
        include: vec!["(?i)interview".to_string()],
        exclude: vec!["(?i)rerun".to_string()],
        max_age: None,
    };
    assert!(!FeedWatcher::matches_filter(&item, &with_exclude));

    let no_match = EpisodeFilter {
        name: "news".to_string(),
        include: vec!["news roundup".to_string()],
        exclude: vec![],
        max_age: None,
    };
    assert!(!FeedWatcher::matches_filter(&item, &no_match));
}

#[test]
fn test_filter_max_age() {
    let old_item = FeedItem {
        title: "Old episode".to_string(),
        link: None,
        guid: "g".to_string(),
        pub_date: Some(Utc::now() - chrono::Duration::days(30)),
        description: None,
        audio_url: None,
        audio_bytes: None,
    };

    let filter = EpisodeFilter {
        name: "recent".to_string(),
        include: vec![],
        exclude: vec![],
        max_age: Some(Duration::from_secs(86400 * 7)),
    };

    assert!(!FeedWatcher::matches_filter(&old_item, &filter));

    // Items without a publication date pass the age check
    let undated = FeedItem {
        pub_date: None,
        ..old_item
    };
    assert!(FeedWatcher::matches_filter(&undated, &filter));
}

#[test]
fn test_invalid_regex_is_skipped() {
    let item = FeedItem {
        title: "anything".to_string(),
        link: None,
        guid: "g".to_string(),
        pub_date: None,
        description: None,
        audio_url: None,
        audio_bytes: None,
    };

    // The broken pattern is dropped, leaving no usable includes, so nothing matches
    let filter = EpisodeFilter {
        name: "broken".to_string(),
        include: vec!["[unclosed".to_string()],
        exclude: vec![],
        max_age: None,
    };
    assert!(!FeedWatcher::matches_filter(&item, &filter));
}

#[tokio::test]
async fn test_diff_records_new_items_once() {
    let (watcher, db) = create_watcher().await;
    let podcast_id = insert_test_podcast(&db).await;

    let items = vec![
        FeedItem {
            title: "With audio".to_string(),
            link: None,
            guid: "ep-1".to_string(),
            pub_date: None,
            description: None,
            audio_url: Some("https://example.com/1.mp3".to_string()),
            audio_bytes: Some(1000),
        },
        FeedItem {
            title: "No audio".to_string(),
            link: None,
            guid: "ep-2".to_string(),
            pub_date: None,
            description: None,
            audio_url: None,
            audio_bytes: None,
        },
    ];

    let diff = watcher
        .diff_feed_items(podcast_id, &[], items.clone())
        .await
        .unwrap();

    assert_eq!(diff.total_items, 2);
    assert_eq!(diff.discovered.len(), 1);
    assert_eq!(diff.discovered[0].1, "With audio");
    assert_eq!(diff.skipped.len(), 1);
    assert_eq!(diff.skipped[0].1, "No audio");

    // A second pass over the same items discovers nothing
    let diff = watcher
        .diff_feed_items(podcast_id, &[], items)
        .await
        .unwrap();
    assert!(diff.discovered.is_empty());
    assert!(diff.skipped.is_empty());
}

#[tokio::test]
async fn test_diff_filtered_items_marked_seen_without_episode() {
    let (watcher, db) = create_watcher().await;
    let podcast_id = insert_test_podcast(&db).await;

    let items = vec![FeedItem {
        title: "Advertisement special".to_string(),
        link: None,
        guid: "ad-1".to_string(),
        pub_date: None,
        description: None,
        audio_url: Some("https://example.com/ad.mp3".to_string()),
        audio_bytes: None,
    }];

    let filters = vec![EpisodeFilter {
        name: "no ads".to_string(),
        include: vec![],
        exclude: vec!["(?i)advertisement".to_string()],
        max_age: None,
    }];

    let diff = watcher
        .diff_feed_items(podcast_id, &filters, items)
        .await
        .unwrap();

    assert!(diff.discovered.is_empty());
    assert!(diff.skipped.is_empty());
    // Marked seen so it never re-enters consideration
    assert!(db.is_feed_item_seen(podcast_id.get(), "ad-1").await.unwrap());
    // And no episode row was created
    assert!(db.get_pending_episodes(10).await.unwrap().is_empty());
}
