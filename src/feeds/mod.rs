//! Podcast feed polling and incremental diffing.
//!
//! This module fetches RSS/Atom podcast feeds, extracts episode metadata
//! (including the audio enclosure), and diffs items against the `feed_seen`
//! table so each episode is annotated at most once. It supports both RSS 2.0
//! and Atom feed formats, with regex-based filtering and age limits.

use crate::config::EpisodeFilter;
use crate::db::{Database, NewEpisode};
use crate::error::{Error, Result};
use crate::types::{EpisodeId, PodcastId};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Represents an item from an RSS or Atom podcast feed
#[derive(Clone, Debug)]
pub struct FeedItem {
    /// Item title
    pub title: String,

    /// Item link/URL
    pub link: Option<String>,

    /// Unique identifier (GUID for RSS, id for Atom)
    pub guid: String,

    /// Publication date
    pub pub_date: Option<DateTime<Utc>>,

    /// Item description / show notes
    pub description: Option<String>,

    /// Audio enclosure URL
    pub audio_url: Option<String>,

    /// Audio size in bytes (from the enclosure, if declared)
    pub audio_bytes: Option<u64>,
}

/// Result of diffing one feed's items against the seen table
#[derive(Debug, Default)]
pub struct FeedDiff {
    /// Total items present in the feed
    pub total_items: usize,

    /// Newly discovered episodes that entered the pipeline queue
    pub discovered: Vec<(EpisodeId, String)>,

    /// Newly recorded episodes that cannot be processed (no audio enclosure)
    pub skipped: Vec<(EpisodeId, String)>,
}

/// Fetches and diffs podcast feeds
///
/// The FeedWatcher is responsible for:
/// - Fetching RSS/Atom feeds over HTTP
/// - Extracting episode metadata and audio enclosures
/// - Tracking seen items to prevent re-annotation
/// - Recording new episodes in the `discovered` state
pub struct FeedWatcher {
    /// HTTP client for fetching feeds
    http_client: reqwest::Client,

    /// Database reference for persistence
    db: Arc<Database>,
}

impl FeedWatcher {
    /// Create a new feed watcher
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(
        db: Arc<Database>,
        fetch_timeout: std::time::Duration,
        user_agent: &str,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Feed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client, db })
    }

    /// Fetch and parse a single podcast feed
    ///
    /// This method:
    /// 1. Fetches the feed content via HTTP
    /// 2. Attempts to parse as RSS, falls back to Atom if that fails
    /// 3. Extracts items with their metadata (title, guid, audio enclosure)
    ///
    /// # Errors
    /// Returns error if the HTTP request fails, the server returns a non-2xx
    /// status, or the content parses as neither RSS nor Atom.
    pub async fn fetch_feed(&self, url: &str) -> Result<Vec<FeedItem>> {
        debug!("Checking podcast feed: {}", url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Feed(format!("Failed to fetch feed: {}", e)))?;

        // Check HTTP status before trying to parse the response body
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Feed(format!(
                "Feed returned HTTP {}: {}",
                status.as_u16(),
                url
            )));
        }

        let content = response
            .text()
            .await
            .map_err(|e| Error::Feed(format!("Failed to read feed content: {}", e)))?;

        // Try parsing as RSS first, then Atom
        match Self::parse_as_rss(&content) {
            Ok(items) => {
                debug!("Successfully parsed as RSS, found {} items", items.len());
                Ok(items)
            }
            Err(rss_err) => {
                debug!("Failed to parse as RSS: {}, trying Atom", rss_err);
                match Self::parse_as_atom(&content) {
                    Ok(items) => {
                        debug!("Successfully parsed as Atom, found {} items", items.len());
                        Ok(items)
                    }
                    Err(atom_err) => Err(Error::Feed(format!(
                        "Failed to parse feed as RSS or Atom. RSS error: {}. Atom error: {}",
                        rss_err, atom_err
                    ))),
                }
            }
        }
    }

    /// Parse feed content as RSS 2.0
    fn parse_as_rss(content: &str) -> Result<Vec<FeedItem>> {
        let channel = content
            .parse::<rss::Channel>()
            .map_err(|e| Error::Feed(format!("RSS parse error: {}", e)))?;

        let items = channel
            .items()
            .iter()
            .map(|item| {
                // Audio URL from the enclosure; podcasts occasionally put it in the link
                let audio_url = item
                    .enclosure()
                    .filter(|enc| {
                        enc.mime_type().starts_with("audio/") || enc.mime_type().is_empty()
                    })
                    .map(|enc| enc.url().to_string())
                    .or_else(|| {
                        item.link()
                            .filter(|link| link.ends_with(".mp3") || link.ends_with(".m4a"))
                            .map(|l| l.to_string())
                    });

                // Stable identifier (prefer guid, fallback to enclosure URL, then title)
                let guid = item
                    .guid()
                    .map(|g| g.value().to_string())
                    .or_else(|| audio_url.clone())
                    .unwrap_or_else(|| item.title().unwrap_or("").to_string());

                // Parse publication date
                let pub_date = item.pub_date().and_then(|date_str| {
                    chrono::DateTime::parse_from_rfc2822(date_str)
                        .ok()
                        .map(|dt| dt.with_timezone(&Utc))
                });

                // Declared enclosure size
                let audio_bytes = item
                    .enclosure()
                    .and_then(|enc| enc.length().parse::<u64>().ok());

                FeedItem {
                    title: item.title().unwrap_or("").to_string(),
                    link: item.link().map(|l| l.to_string()),
                    guid,
                    pub_date,
                    description: item.description().map(|d| d.to_string()),
                    audio_url,
                    audio_bytes,
                }
            })
            .collect();

        Ok(items)
    }

    /// Parse feed content as Atom
    fn parse_as_atom(content: &str) -> Result<Vec<FeedItem>> {
        let feed = atom_syndication::Feed::read_from(content.as_bytes())
            .map_err(|e| Error::Feed(format!("Atom parse error: {}", e)))?;

        let items = feed
            .entries()
            .iter()
            .map(|entry| {
                // GUID is the entry ID
                let guid = entry.id().to_string();

                // Publication date (prefer published, fallback to updated)
                let pub_date = entry
                    .published()
                    .or_else(|| Some(entry.updated()))
                    .and_then(|dt| {
                        chrono::DateTime::parse_from_rfc3339(&dt.to_rfc3339())
                            .ok()
                            .map(|dt| dt.with_timezone(&Utc))
                    });

                // Audio URL from enclosure-type links
                let enclosure = entry.links().iter().find(|link| {
                    link.rel() == "enclosure"
                        || link
                            .mime_type()
                            .map(|m| m.starts_with("audio/"))
                            .unwrap_or(false)
                });
                let audio_url = enclosure.map(|link| link.href().to_string());

                let audio_bytes =
                    enclosure.and_then(|link| link.length().and_then(|l| l.parse::<u64>().ok()));

                // Try to get the primary link
                let link = entry.links().first().map(|link| link.href().to_string());

                // Description from summary or content
                let description = entry.summary().map(|s| s.as_str().to_string()).or_else(|| {
                    entry
                        .content()
                        .and_then(|c| c.value().map(|v| v.to_string()))
                });

                FeedItem {
                    title: entry.title().as_str().to_string(),
                    link,
                    guid,
                    pub_date,
                    description,
                    audio_url,
                    audio_bytes,
                }
            })
            .collect();

        Ok(items)
    }

    /// Compile and validate a list of regex patterns, returning compiled regexes.
    /// Invalid patterns are logged and skipped.
    fn compile_patterns(patterns: &[String], kind: &str) -> Vec<Regex> {
        patterns
            .iter()
            .filter_map(|pattern| {
                // Use RegexBuilder with a size limit to prevent ReDoS via large compiled DFAs
                regex::RegexBuilder::new(pattern)
                    .size_limit(1024 * 1024) // 1MB compiled DFA limit
                    .build()
                    .map_err(|e| {
                        warn!("Invalid {} regex pattern '{}': {}", kind, pattern, e);
                    })
                    .ok()
            })
            .collect()
    }

    /// Check if a feed item matches the configured filter
    ///
    /// Filtering logic:
    /// 1. If include patterns exist, at least one must match (OR logic)
    /// 2. If exclude patterns exist, none must match (exclude overrides include)
    /// 3. Age constraint (max_age) is checked against publication date if specified
    pub fn matches_filter(item: &FeedItem, filter: &EpisodeFilter) -> bool {
        // Build the search text (title + description)
        let search_text = format!(
            "{} {}",
            item.title,
            item.description.as_deref().unwrap_or("")
        );

        // Check include patterns (OR logic - at least one must match)
        if !filter.include.is_empty() {
            let compiled_includes = Self::compile_patterns(&filter.include, "include");
            let any_include_matches = compiled_includes.iter().any(|re| re.is_match(&search_text));

            if !any_include_matches {
                debug!(
                    "Item '{}' rejected: no include patterns matched",
                    item.title
                );
                return false;
            }
        }

        // Check exclude patterns (ANY exclude match = reject)
        let compiled_excludes = Self::compile_patterns(&filter.exclude, "exclude");
        for re in &compiled_excludes {
            if re.is_match(&search_text) {
                debug!(
                    "Item '{}' rejected: matched exclude pattern '{}'",
                    item.title,
                    re.as_str()
                );
                return false;
            }
        }

        // Check age constraint
        if let Some(max_age) = filter.max_age {
            if let Some(pub_date) = item.pub_date {
                let age = Utc::now().signed_duration_since(pub_date);
                let max_age_chrono =
                    chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);

                if age > max_age_chrono {
                    debug!(
                        "Item '{}' rejected: age {:?} > max {:?}",
                        item.title, age, max_age_chrono
                    );
                    return false;
                }
            }
        }

        debug!("Item '{}' accepted: passed all filter checks", item.title);
        true
    }

    /// Diff feed items against the seen table and record new episodes
    ///
    /// For each item:
    /// 1. Items already in the seen table are skipped
    /// 2. Filters are applied; non-matching items are marked seen but never
    ///    recorded as episodes
    /// 3. Matching items are marked seen and inserted in the `discovered`
    ///    state; items without an audio enclosure are immediately moved to
    ///    the terminal `skipped` state
    ///
    /// Marking seen before any pipeline work gives at-most-once annotation
    /// per guid even across crashes.
    pub async fn diff_feed_items(
        &self,
        podcast_id: PodcastId,
        filters: &[EpisodeFilter],
        items: Vec<FeedItem>,
    ) -> Result<FeedDiff> {
        let mut diff = FeedDiff {
            total_items: items.len(),
            ..FeedDiff::default()
        };

        for item in items {
            // Skip if already seen
            if self.db.is_feed_item_seen(podcast_id.get(), &item.guid).await? {
                debug!("Skipping already seen item: {}", item.title);
                continue;
            }

            // Check if item matches any of the configured filters
            let matches = if filters.is_empty() {
                // No filters = accept everything
                true
            } else {
                // At least one filter must match
                filters.iter().any(|filter| Self::matches_filter(&item, filter))
            };

            // Mark as seen to prevent re-processing
            self.db
                .mark_feed_item_seen(podcast_id.get(), &item.guid)
                .await?;

            if !matches {
                debug!("Item '{}' did not match any filters, skipping", item.title);
                continue;
            }

            let episode_id = self
                .db
                .insert_episode(&NewEpisode {
                    podcast_id,
                    guid: item.guid.clone(),
                    title: item.title.clone(),
                    description: item.description.clone(),
                    audio_url: item.audio_url.clone(),
                    audio_bytes: item.audio_bytes.map(|b| b as i64),
                    published_at: item.pub_date.map(|dt| dt.timestamp()),
                })
                .await?;

            if item.audio_url.is_some() {
                info!("New episode discovered: {}", item.title);
                diff.discovered.push((episode_id, item.title));
            } else {
                debug!("Item '{}' has no audio enclosure, skipping", item.title);
                self.db
                    .set_episode_skipped(episode_id, "no audio enclosure")
                    .await?;
                diff.skipped.push((episode_id, item.title));
            }
        }

        Ok(diff)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
