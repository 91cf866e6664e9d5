//! Upload repository: the append-only `uploads` usage events, per §3.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use meridian_common::db::RepositoryError;

use crate::domain::entities::Upload;

#[derive(Clone)]
pub struct UploadRepository {
    pool: PgPool,
}

/// One page of a user's uploads, per §6's pagination contract.
pub struct Page<T> {
    pub items: Vec<T>,
    pub offset: i64,
    pub page_size: i64,
    pub count: i64,
}

impl UploadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Records a new upload event. `user_id` is `None` for anonymous
    /// uploads, per §3.
    pub async fn record(
        &self,
        user_id: Option<Uuid>,
        skylink_id: Uuid,
        client_ip: Option<String>,
    ) -> Result<Upload, RepositoryError> {
        let upload = sqlx::query_as(
            r#"
            INSERT INTO uploads (id, user_id, skylink_id, client_ip, unpinned_at, created_at)
            VALUES ($1, $2, $3, $4, NULL, NOW())
            RETURNING id, user_id, skylink_id, client_ip, unpinned_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(skylink_id)
        .bind(client_ip)
        .fetch_one(&self.pool)
        .await?;
        Ok(upload)
    }

    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        offset: i64,
        page_size: i64,
    ) -> Result<Page<Upload>, RepositoryError> {
        let items = sqlx::query_as(
            r#"
            SELECT id, user_id, skylink_id, client_ip, unpinned_at, created_at
            FROM uploads
            WHERE user_id = $1
            ORDER BY created_at DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(offset)
        .bind(page_size)
        .fetch_all(&self.pool)
        .await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM uploads WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(Page { items, offset, page_size, count })
    }

    /// Unpin every non-unpinned upload of `user_id` for a given skylink,
    /// atomically, per §4.6 (`DELETE /skylink/:skylink`,
    /// `DELETE /user/uploads/:skylink`). Returns the number of rows
    /// touched. Unpinning never deletes the row — historical bandwidth
    /// accounting still needs it (§3).
    pub async fn unpin_all(&self, user_id: Uuid, skylink_id: Uuid) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE uploads SET unpinned_at = NOW() WHERE user_id = $1 AND skylink_id = $2 AND unpinned_at IS NULL",
        )
        .bind(user_id)
        .bind(skylink_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn active_count_for_user(&self, user_id: Uuid) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM uploads WHERE user_id = $1 AND unpinned_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// For property-test support: the set of (skylink size) pairs behind
    /// a user's active uploads, per §8's invariant on `TotalUploadsSize`.
    pub async fn active_sizes_for_user(&self, user_id: Uuid) -> Result<Vec<i64>, RepositoryError> {
        let sizes: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT s.size FROM uploads u
            JOIN skylinks s ON s.id = u.skylink_id
            WHERE u.user_id = $1 AND u.unpinned_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sizes.into_iter().map(|(s,)| s).collect())
    }

    pub async fn last_unpinned_at(&self, upload_id: Uuid) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        let at: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT unpinned_at FROM uploads WHERE id = $1")
                .bind(upload_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(at)
    }
}
