//! Image ownership ledger
//!
//! The single source of truth for who owns which image. The blob store has
//! no notion of ownership; every authorization decision goes through here.

use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::ids::ImageId;
use crate::models::ImageRecord;

/// Outcome of an ownership-checked removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
    /// The image exists but belongs to a different user. HTTP clients see
    /// this as NotFound.
    Forbidden,
}

/// Image repository
#[derive(Clone)]
pub struct ImageRepository {
    pool: SqlitePool,
}

impl ImageRepository {
    /// Create a new image repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record that `user_id` uploaded the image `id`.
    pub async fn record_upload(&self, id: &ImageId, user_id: Uuid) -> Result<ImageRecord> {
        let uploaded_at = Utc::now();

        sqlx::query("INSERT INTO images (id, user_id, uploaded_at) VALUES ($1, $2, $3)")
            .bind(id.as_str())
            .bind(user_id.to_string())
            .bind(uploaded_at)
            .execute(&self.pool)
            .await?;

        let record = ImageRecord {
            id: id.clone(),
            user_id,
            uploaded_at,
        };
        info!(
            "Recorded upload {} for user {} at {}",
            record.id, record.user_id, record.uploaded_at
        );
        Ok(record)
    }

    /// Whether `user_id` owns the image `id`.
    pub async fn is_owner(&self, id: &ImageId, user_id: Uuid) -> Result<bool> {
        Ok(self.owner_of(id).await? == Some(user_id))
    }

    /// List the ids of every image owned by `user_id`, newest first.
    pub async fn list_by_owner(&self, user_id: Uuid) -> Result<Vec<ImageId>> {
        let rows =
            sqlx::query("SELECT id FROM images WHERE user_id = $1 ORDER BY uploaded_at DESC, id")
                .bind(user_id.to_string())
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|row| {
                let id: String = row.get("id");
                id.parse::<ImageId>().map_err(anyhow::Error::from)
            })
            .collect()
    }

    /// Remove the ownership record for `id`, but only when `user_id` owns
    /// it.
    pub async fn remove(&self, id: &ImageId, user_id: Uuid) -> Result<RemoveOutcome> {
        let Some(owner) = self.owner_of(id).await? else {
            return Ok(RemoveOutcome::NotFound);
        };
        if owner != user_id {
            return Ok(RemoveOutcome::Forbidden);
        }

        sqlx::query("DELETE FROM images WHERE id = $1 AND user_id = $2")
            .bind(id.as_str())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;

        info!("Removed ownership record {}", id);
        Ok(RemoveOutcome::Removed)
    }

    async fn owner_of(&self, id: &ImageId) -> Result<Option<Uuid>> {
        let row = sqlx::query("SELECT user_id FROM images WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let owner: String = row.get("user_id");
                Ok(Some(Uuid::parse_str(&owner)?))
            }
            None => Ok(None),
        }
    }
}
