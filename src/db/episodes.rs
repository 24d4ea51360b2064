//! Episode records and annotation results.

use crate::error::DatabaseError;
use crate::types::{EpisodeId, EpisodeStatus};
use crate::{Error, Result};

use super::{Database, EpisodeRow, NewEpisode};

impl Database {
    /// Insert a newly discovered episode
    pub async fn insert_episode(&self, episode: &NewEpisode) -> Result<EpisodeId> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO episodes (podcast_id, guid, title, description, audio_url,
                                  audio_bytes, published_at, status, discovered_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(episode.podcast_id)
        .bind(&episode.guid)
        .bind(&episode.title)
        .bind(&episode.description)
        .bind(&episode.audio_url)
        .bind(episode.audio_bytes)
        .bind(episode.published_at)
        .bind(EpisodeStatus::Discovered.to_i32())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert episode: {}",
                e
            )))
        })?;

        Ok(EpisodeId::new(result.last_insert_rowid()))
    }

    /// Get episode by ID
    pub async fn get_episode(&self, id: EpisodeId) -> Result<Option<EpisodeRow>> {
        let episode = sqlx::query_as::<_, EpisodeRow>(
            r#"
            SELECT id, podcast_id, guid, title, description, audio_url, audio_bytes,
                   published_at, status, error_message, transcript, summary,
                   discovered_at, annotated_at
            FROM episodes
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get episode: {}",
                e
            )))
        })?;

        Ok(episode)
    }

    /// List episodes, optionally filtered by status, newest publication first
    pub async fn list_episodes(
        &self,
        status: Option<EpisodeStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EpisodeRow>> {
        let episodes = match status {
            Some(status) => {
                sqlx::query_as::<_, EpisodeRow>(
                    r#"
                    SELECT id, podcast_id, guid, title, description, audio_url, audio_bytes,
                           published_at, status, error_message, transcript, summary,
                           discovered_at, annotated_at
                    FROM episodes
                    WHERE status = ?
                    ORDER BY published_at DESC, id DESC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(status.to_i32())
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, EpisodeRow>(
                    r#"
                    SELECT id, podcast_id, guid, title, description, audio_url, audio_bytes,
                           published_at, status, error_message, transcript, summary,
                           discovered_at, annotated_at
                    FROM episodes
                    ORDER BY published_at DESC, id DESC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list episodes: {}",
                e
            )))
        })?;

        Ok(episodes)
    }

    /// Get discovered episodes awaiting annotation, oldest publication first
    ///
    /// The per-cycle cap is applied here; anything beyond `limit` stays
    /// discovered and is picked up by a later cycle.
    pub async fn get_pending_episodes(&self, limit: i64) -> Result<Vec<EpisodeRow>> {
        let episodes = sqlx::query_as::<_, EpisodeRow>(
            r#"
            SELECT id, podcast_id, guid, title, description, audio_url, audio_bytes,
                   published_at, status, error_message, transcript, summary,
                   discovered_at, annotated_at
            FROM episodes
            WHERE status = ?
            ORDER BY published_at ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(EpisodeStatus::Discovered.to_i32())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get pending episodes: {}",
                e
            )))
        })?;

        Ok(episodes)
    }

    /// Update episode status
    pub async fn set_episode_status(&self, id: EpisodeId, status: EpisodeStatus) -> Result<()> {
        sqlx::query("UPDATE episodes SET status = ? WHERE id = ?")
            .bind(status.to_i32())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to set episode status: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Mark an episode failed with an error message
    pub async fn set_episode_failed(&self, id: EpisodeId, error: &str) -> Result<()> {
        sqlx::query("UPDATE episodes SET status = ?, error_message = ? WHERE id = ?")
            .bind(EpisodeStatus::Failed.to_i32())
            .bind(error)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to mark episode failed: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Mark an episode skipped (no audio enclosure, filtered out)
    pub async fn set_episode_skipped(&self, id: EpisodeId, reason: &str) -> Result<()> {
        sqlx::query("UPDATE episodes SET status = ?, error_message = ? WHERE id = ?")
            .bind(EpisodeStatus::Skipped.to_i32())
            .bind(reason)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to mark episode skipped: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Store the transcript produced by the transcription stage
    pub async fn set_episode_transcript(&self, id: EpisodeId, transcript: &str) -> Result<()> {
        sqlx::query("UPDATE episodes SET transcript = ? WHERE id = ?")
            .bind(transcript)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to set episode transcript: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Store the summary produced by the summarization stage
    pub async fn set_episode_summary(&self, id: EpisodeId, summary: &str) -> Result<()> {
        sqlx::query("UPDATE episodes SET summary = ? WHERE id = ?")
            .bind(summary)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to set episode summary: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Mark an episode fully annotated
    pub async fn set_episode_annotated(&self, id: EpisodeId) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            UPDATE episodes
            SET status = ?, annotated_at = ?, error_message = NULL
            WHERE id = ?
            "#,
        )
        .bind(EpisodeStatus::Annotated.to_i32())
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark episode annotated: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Count episodes per status code
    pub async fn count_episodes_by_status(&self) -> Result<Vec<(i32, i64)>> {
        let counts: Vec<(i32, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM episodes GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to count episodes: {}",
                        e
                    )))
                })?;

        Ok(counts)
    }
}
