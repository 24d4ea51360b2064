//! Runtime state tracking: shutdown detection, seen feed items, recovery.

use crate::error::DatabaseError;
use crate::types::EpisodeStatus;
use crate::{Error, Result};

use super::Database;

impl Database {
    /// Check if the last shutdown was unclean
    ///
    /// Returns true if the previous session did not call set_clean_shutdown(),
    /// indicating a crash or forced termination.
    ///
    /// This method is called on startup to determine if state recovery is needed.
    pub async fn was_unclean_shutdown(&self) -> Result<bool> {
        let value: Option<String> = sqlx::query_scalar(
            r#"
            SELECT value FROM runtime_state WHERE key = 'clean_shutdown'
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to check shutdown state: {}",
                e
            )))
        })?;

        // If the value is missing or "false", it was an unclean shutdown
        Ok(value.is_none_or(|v| v != "true"))
    }

    /// Mark that the application has started cleanly
    ///
    /// Called during startup to indicate the service is running. If shutdown()
    /// is not called before the next startup, was_unclean_shutdown() will
    /// return true.
    pub async fn set_clean_start(&self) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO runtime_state (key, value, updated_at)
            VALUES ('clean_shutdown', 'false', ?)
            ON CONFLICT(key) DO UPDATE SET value = 'false', updated_at = ?
            "#,
        )
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to set clean start: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Mark that the application is shutting down cleanly
    ///
    /// If this is not called before the process exits, the next startup will
    /// detect an unclean shutdown and reset episodes stuck mid-pipeline.
    pub async fn set_clean_shutdown(&self) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO runtime_state (key, value, updated_at)
            VALUES ('clean_shutdown', 'true', ?)
            ON CONFLICT(key) DO UPDATE SET value = 'true', updated_at = ?
            "#,
        )
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to set clean shutdown: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Reset episodes stuck in a transient pipeline state back to discovered
    ///
    /// Called on startup after an unclean shutdown. Episodes that were mid-
    /// annotation when the process died re-enter the queue from the start;
    /// terminal states are left alone.
    pub async fn reset_transient_episodes(&self) -> Result<u64> {
        let transient: Vec<i32> = EpisodeStatus::all()
            .iter()
            .filter(|s| s.is_transient())
            .map(|s| s.to_i32())
            .collect();

        let placeholders = vec!["?"; transient.len()].join(", ");
        let sql = format!(
            "UPDATE episodes SET status = ?, error_message = NULL WHERE status IN ({})",
            placeholders
        );

        let mut query = sqlx::query(&sql).bind(EpisodeStatus::Discovered.to_i32());
        for status in &transient {
            query = query.bind(status);
        }

        let result = query.execute(&self.pool).await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to reset transient episodes: {}",
                e
            )))
        })?;

        Ok(result.rows_affected())
    }

    /// Check if a feed item has been seen before
    pub async fn is_feed_item_seen(&self, podcast_id: i64, guid: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM feed_seen WHERE podcast_id = ? AND guid = ?
            "#,
        )
        .bind(podcast_id)
        .bind(guid)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to check if feed item is seen: {}",
                e
            )))
        })?;

        Ok(count > 0)
    }

    /// Mark a feed item as seen
    pub async fn mark_feed_item_seen(&self, podcast_id: i64, guid: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO feed_seen (podcast_id, guid, seen_at)
            VALUES (?, ?, ?)
            ON CONFLICT(podcast_id, guid) DO UPDATE SET seen_at = ?
            "#,
        )
        .bind(podcast_id)
        .bind(guid)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark feed item as seen: {}",
                e
            )))
        })?;

        Ok(())
    }
}
