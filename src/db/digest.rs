//! Digest windows and send log.

use crate::error::DatabaseError;
use crate::types::EpisodeStatus;
use crate::{Error, Result};

use super::{Database, DigestEpisodeRow, DigestLogRow};

impl Database {
    /// Unix timestamp of the last successful digest send, if any
    ///
    /// This is the lower bound of the next digest window. Failed attempts do
    /// not advance the window.
    pub async fn last_successful_digest(&self) -> Result<Option<i64>> {
        let window_end: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT MAX(window_end) FROM digest_log WHERE sent = 1
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get last digest time: {}",
                e
            )))
        })?;

        Ok(window_end)
    }

    /// Episodes annotated within a window, joined with podcast titles
    ///
    /// Ordered by annotation time so the digest reads oldest first.
    pub async fn get_digest_episodes(
        &self,
        window_start: i64,
        window_end: i64,
    ) -> Result<Vec<DigestEpisodeRow>> {
        let episodes = sqlx::query_as::<_, DigestEpisodeRow>(
            r#"
            SELECT e.id, p.title AS podcast_title, e.title, e.summary, e.annotated_at
            FROM episodes e
            JOIN podcasts p ON p.id = e.podcast_id
            WHERE e.status = ? AND e.annotated_at > ? AND e.annotated_at <= ?
            ORDER BY e.annotated_at ASC
            "#,
        )
        .bind(EpisodeStatus::Annotated.to_i32())
        .bind(window_start)
        .bind(window_end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get digest episodes: {}",
                e
            )))
        })?;

        Ok(episodes)
    }

    /// Record a digest attempt, successful or not
    pub async fn record_digest(
        &self,
        window_start: i64,
        window_end: i64,
        episode_count: i64,
        sent: bool,
        error: Option<&str>,
    ) -> Result<i64> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO digest_log (window_start, window_end, episode_count, sent, error, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(window_start)
        .bind(window_end)
        .bind(episode_count)
        .bind(sent as i32)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to record digest: {}",
                e
            )))
        })?;

        Ok(result.last_insert_rowid())
    }

    /// Recent digest log entries, newest first
    pub async fn get_digest_log(&self, limit: i64) -> Result<Vec<DigestLogRow>> {
        let entries = sqlx::query_as::<_, DigestLogRow>(
            r#"
            SELECT id, window_start, window_end, episode_count, sent, error, created_at
            FROM digest_log
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get digest log: {}",
                e
            )))
        })?;

        Ok(entries)
    }
}
