//! The single aggregation query the quota evaluator runs per user, per
//! §4.3 ("Aggregation ... built from one data-access call").

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::quota::{
    self, Aggregation, REGISTRY_READ_BANDWIDTH_BYTES, REGISTRY_WRITE_BANDWIDTH_BYTES,
};

#[derive(sqlx::FromRow)]
struct UploadRow {
    size: i64,
    unpinned: bool,
}

#[derive(sqlx::FromRow)]
struct Totals {
    read_count: i64,
    write_count: i64,
}

/// Builds a user's [`Aggregation`] from the uploads/downloads/registry
/// tables. Anonymous events are excluded by `WHERE user_id IS NOT NULL`
/// at the source — they never reach these queries in the first place, so
/// there's no need to filter them again here (§4.3).
pub async fn aggregate_for_user(pool: &PgPool, user_id: Uuid) -> Result<Aggregation, sqlx::Error> {
    let upload_rows: Vec<UploadRow> = sqlx::query_as(
        r#"
        SELECT s.size AS size, (u.unpinned_at IS NOT NULL) AS unpinned
        FROM uploads u
        JOIN skylinks s ON s.id = u.skylink_id
        WHERE u.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut num_active_uploads = 0i64;
    let mut total_uploads_size = 0i64;
    let mut total_raw_storage = 0i64;
    let mut total_upload_bandwidth = 0i64;

    for row in &upload_rows {
        // Historical upload bandwidth counts every ingested upload,
        // pinned or not (§3: unpinning "still contributes to historical
        // bandwidth").
        total_upload_bandwidth += quota::upload_bandwidth_used(row.size);
        if !row.unpinned {
            num_active_uploads += 1;
            total_uploads_size += row.size;
            total_raw_storage += quota::raw_storage_used(row.size);
        }
    }

    let download_bytes: Vec<(i64,)> =
        sqlx::query_as("SELECT bytes FROM downloads WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(pool)
            .await?;
    let total_download_bandwidth: i64 = download_bytes
        .iter()
        .map(|(bytes,)| quota::download_bandwidth_used(*bytes))
        .sum();

    let totals: Totals = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM registry_reads WHERE user_id = $1) AS read_count,
            (SELECT COUNT(*) FROM registry_writes WHERE user_id = $1) AS write_count
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(Aggregation {
        num_active_uploads,
        total_uploads_size,
        total_raw_storage,
        total_upload_bandwidth,
        total_download_bandwidth,
        total_registry_read_bandwidth: totals.read_count * REGISTRY_READ_BANDWIDTH_BYTES,
        total_registry_write_bandwidth: totals.write_count * REGISTRY_WRITE_BANDWIDTH_BYTES,
    })
}
