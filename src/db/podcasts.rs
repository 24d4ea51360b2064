//! Podcast feed CRUD operations.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, InsertPodcastParams, PodcastRow, UpdatePodcastParams};

impl Database {
    /// Get all podcasts
    pub async fn get_all_podcasts(&self) -> Result<Vec<PodcastRow>> {
        let podcasts = sqlx::query_as::<_, PodcastRow>(
            r#"
            SELECT id, title, url, check_interval_secs, enabled,
                   last_check, last_error, created_at
            FROM podcasts
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get podcasts: {}",
                e
            )))
        })?;

        Ok(podcasts)
    }

    /// Get podcast by ID
    pub async fn get_podcast(&self, id: i64) -> Result<Option<PodcastRow>> {
        let podcast = sqlx::query_as::<_, PodcastRow>(
            r#"
            SELECT id, title, url, check_interval_secs, enabled,
                   last_check, last_error, created_at
            FROM podcasts
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get podcast: {}",
                e
            )))
        })?;

        Ok(podcast)
    }

    /// Get podcast by feed URL (used when merging configured feeds on startup)
    pub async fn get_podcast_by_url(&self, url: &str) -> Result<Option<PodcastRow>> {
        let podcast = sqlx::query_as::<_, PodcastRow>(
            r#"
            SELECT id, title, url, check_interval_secs, enabled,
                   last_check, last_error, created_at
            FROM podcasts
            WHERE url = ?
            "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get podcast by url: {}",
                e
            )))
        })?;

        Ok(podcast)
    }

    /// Insert a new podcast
    pub async fn insert_podcast(&self, params: InsertPodcastParams<'_>) -> Result<i64> {
        let InsertPodcastParams {
            title,
            url,
            check_interval_secs,
            enabled,
        } = params;
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO podcasts (title, url, check_interval_secs, enabled, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(title)
        .bind(url)
        .bind(check_interval_secs)
        .bind(enabled as i32)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert podcast: {}",
                e
            )))
        })?;

        Ok(result.last_insert_rowid())
    }

    /// Update an existing podcast
    pub async fn update_podcast(&self, params: UpdatePodcastParams<'_>) -> Result<bool> {
        let UpdatePodcastParams {
            id,
            title,
            url,
            check_interval_secs,
            enabled,
        } = params;
        let result = sqlx::query(
            r#"
            UPDATE podcasts
            SET title = ?, url = ?, check_interval_secs = ?, enabled = ?
            WHERE id = ?
            "#,
        )
        .bind(title)
        .bind(url)
        .bind(check_interval_secs)
        .bind(enabled as i32)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update podcast: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a podcast (cascades to episodes, flags, and seen items)
    pub async fn delete_podcast(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM podcasts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete podcast: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected() > 0)
    }

    /// Update last check time and error for a podcast
    pub async fn update_podcast_check_status(
        &self,
        id: i64,
        last_error: Option<&str>,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            UPDATE podcasts
            SET last_check = ?, last_error = ?
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(last_error)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update podcast check status: {}",
                e
            )))
        })?;

        Ok(())
    }
}
