//! Topic CRUD and per-episode relevance flags.

use crate::error::DatabaseError;
use crate::types::EpisodeId;
use crate::{Error, Result};

use super::{Database, TopicFlagRow, TopicRow};

impl Database {
    /// Get all topics
    pub async fn get_all_topics(&self) -> Result<Vec<TopicRow>> {
        let topics = sqlx::query_as::<_, TopicRow>(
            r#"
            SELECT id, name, description, created_at
            FROM topics
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get topics: {}",
                e
            )))
        })?;

        Ok(topics)
    }

    /// Get topic by ID
    pub async fn get_topic(&self, id: i64) -> Result<Option<TopicRow>> {
        let topic = sqlx::query_as::<_, TopicRow>(
            r#"
            SELECT id, name, description, created_at
            FROM topics
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get topic: {}",
                e
            )))
        })?;

        Ok(topic)
    }

    /// Get topic by name (used when merging configured topics on startup)
    pub async fn get_topic_by_name(&self, name: &str) -> Result<Option<TopicRow>> {
        let topic = sqlx::query_as::<_, TopicRow>(
            r#"
            SELECT id, name, description, created_at
            FROM topics
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get topic by name: {}",
                e
            )))
        })?;

        Ok(topic)
    }

    /// Insert a new topic
    pub async fn insert_topic(&self, name: &str, description: Option<&str>) -> Result<i64> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO topics (name, description, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert topic: {}",
                e
            )))
        })?;

        Ok(result.last_insert_rowid())
    }

    /// Update an existing topic
    pub async fn update_topic(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE topics SET name = ?, description = ? WHERE id = ?")
            .bind(name)
            .bind(description)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to update topic: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a topic (cascades to its flags)
    pub async fn delete_topic(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM topics WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete topic: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a relevance decision for one episode/topic pair
    ///
    /// Re-flagging the same pair overwrites the previous decision.
    pub async fn insert_topic_flag(
        &self,
        episode_id: EpisodeId,
        topic_id: i64,
        relevant: bool,
        reason: Option<&str>,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO topic_flags (episode_id, topic_id, relevant, reason, flagged_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(episode_id, topic_id)
            DO UPDATE SET relevant = excluded.relevant, reason = excluded.reason,
                          flagged_at = excluded.flagged_at
            "#,
        )
        .bind(episode_id)
        .bind(topic_id)
        .bind(relevant as i32)
        .bind(reason)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert topic flag: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Get all flags for an episode, joined with topic names
    pub async fn get_topic_flags(&self, episode_id: EpisodeId) -> Result<Vec<TopicFlagRow>> {
        let flags = sqlx::query_as::<_, TopicFlagRow>(
            r#"
            SELECT f.id, f.episode_id, f.topic_id, t.name AS topic_name,
                   f.relevant, f.reason, f.flagged_at
            FROM topic_flags f
            JOIN topics t ON t.id = f.topic_id
            WHERE f.episode_id = ?
            ORDER BY t.id ASC
            "#,
        )
        .bind(episode_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get topic flags: {}",
                e
            )))
        })?;

        Ok(flags)
    }
}
