//! Multi-step atomic writes that don't belong to a single entity's
//! repository, per §4.5/§7. Each public function here opens its own
//! transaction, commits on success, and is retried on write conflict via
//! [`super::conflict::with_retry`] — never left half-applied.
//!
//! Quota re-evaluation is deliberately not part of any of these
//! transactions: it runs off the request path (`domain::quota::
//! evaluate_and_persist`, spawned by the caller after a function here
//! returns), so a slow aggregation query never holds open the short
//! transaction a client is waiting on.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::entities::{Download, RegistryRead, RegistryWrite, Upload};
use crate::repository::conflict::with_retry;

async fn fill_skylink_metadata_tx(
    tx: &mut Transaction<'_, Postgres>,
    skylink_id: Uuid,
    filename: Option<&str>,
    size: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE skylinks SET
            filename = COALESCE(filename, $1),
            size = CASE WHEN size = 0 THEN $2 ELSE size END
        WHERE id = $3
        "#,
    )
    .bind(filename)
    .bind(size)
    .bind(skylink_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn record_upload_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Option<Uuid>,
    skylink_id: Uuid,
    client_ip: Option<&str>,
) -> Result<Upload, sqlx::Error> {
    sqlx::query_as(
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
    .fetch_one(&mut **tx)
    .await
}

async fn unpin_all_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    skylink_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE uploads SET unpinned_at = NOW() WHERE user_id = $1 AND skylink_id = $2 AND unpinned_at IS NULL",
    )
    .bind(user_id)
    .bind(skylink_id)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected())
}

/// Records an upload event and, on first sight of the skylink's actual
/// size, fills in its filename/size — atomically. `size <= 0` (unknown at
/// upload time) leaves the skylink's size untouched for the metadata
/// fetcher to fill in later (§4.7).
pub async fn track_upload(
    pool: &PgPool,
    user_id: Option<Uuid>,
    skylink_id: Uuid,
    filename: Option<&str>,
    size: i64,
    client_ip: Option<&str>,
) -> Result<Upload, sqlx::Error> {
    with_retry(|| async {
        let mut tx = pool.begin().await?;
        if size > 0 {
            fill_skylink_metadata_tx(&mut tx, skylink_id, filename, size).await?;
        }
        let upload = record_upload_tx(&mut tx, user_id, skylink_id, client_ip).await?;
        tx.commit().await?;
        Ok(upload)
    })
    .await
}

/// Unpins every active upload `user_id` holds against `skylink_id`,
/// atomically. Backs both `DELETE /skylink/:skylink` and `DELETE
/// /user/uploads/:skylink` (§6) — the two differ only in how the handler
/// resolves `skylink_id`, not in what happens here.
pub async fn unpin_upload(pool: &PgPool, user_id: Uuid, skylink_id: Uuid) -> Result<u64, sqlx::Error> {
    with_retry(|| async {
        let mut tx = pool.begin().await?;
        let rows = unpin_all_tx(&mut tx, user_id, skylink_id).await?;
        tx.commit().await?;
        Ok(rows)
    })
    .await
}

/// Records a download report, retried on write conflict like every other
/// append here (§8's scenario 6 exercises the registry-read sibling of
/// this, but the retry applies uniformly to all four event tables).
pub async fn track_download(
    pool: &PgPool,
    user_id: Option<Uuid>,
    skylink_id: Uuid,
    client_ip: Option<&str>,
    bytes: i64,
) -> Result<Download, sqlx::Error> {
    with_retry(|| async {
        sqlx::query_as(
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
        .fetch_one(pool)
        .await
    })
    .await
}

/// Records a registry-read event, retried on write conflict per §8's
/// scenario 6 ("inject a transient write-conflict on the first attempt
/// of `POST /track/registry/read`; expect the handler to retry and
/// succeed").
pub async fn track_registry_read(
    pool: &PgPool,
    user_id: Option<Uuid>,
    client_ip: Option<&str>,
) -> Result<RegistryRead, sqlx::Error> {
    with_retry(|| async {
        sqlx::query_as(
            r#"
            INSERT INTO registry_reads (id, user_id, client_ip, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING id, user_id, client_ip, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(client_ip)
        .fetch_one(pool)
        .await
    })
    .await
}

pub async fn track_registry_write(
    pool: &PgPool,
    user_id: Option<Uuid>,
    client_ip: Option<&str>,
) -> Result<RegistryWrite, sqlx::Error> {
    with_retry(|| async {
        sqlx::query_as(
            r#"
            INSERT INTO registry_writes (id, user_id, client_ip, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING id, user_id, client_ip, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(client_ip)
        .fetch_one(pool)
        .await
    })
    .await
}
