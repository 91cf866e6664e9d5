//! Download repository: the append-only `downloads` usage events, per §3.

use sqlx::PgPool;
use uuid::Uuid;

use meridian_common::db::RepositoryError;

use crate::domain::entities::Download;
use crate::repository::uploads::Page;

#[derive(Clone)]
pub struct DownloadRepository {
    pool: PgPool,
}

impl DownloadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Records a download report. Per §4.6, zero-byte reports (browser
    /// control fetches) are filtered by the handler before this is
    /// called — this method trusts its caller's `bytes` is `> 0`.
    pub async fn record(
        &self,
        user_id: Option<Uuid>,
        skylink_id: Uuid,
        client_ip: Option<String>,
        bytes: i64,
    ) -> Result<Download, RepositoryError> {
        let download = sqlx::query_as(
            r#"
            INSERT INTO downloads (id, user_id, skylink_id, client_ip, bytes, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING id, user_id, skylink_id, client_ip, bytes, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(skylink_id)
        .bind(client_ip)
        .bind(bytes)
        .fetch_one(&self.pool)
        .await?;
        Ok(download)
    }

    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        offset: i64,
        page_size: i64,
    ) -> Result<Page<Download>, RepositoryError> {
        let items = sqlx::query_as(
            r#"
            SELECT id, user_id, skylink_id, client_ip, bytes, created_at
            FROM downloads
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

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM downloads WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(Page { items, offset, page_size, count })
    }

    pub async fn total_bytes_for_user(&self, user_id: Uuid) -> Result<i64, RepositoryError> {
        let total: Option<i64> =
            sqlx::query_scalar("SELECT SUM(bytes) FROM downloads WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(total.unwrap_or(0))
    }
}
