//! API key repository, per §3 "API key" and §6's CRUD surface.

use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use meridian_common::db::RepositoryError;

use crate::domain::entities::ApiKey;

#[derive(Clone)]
pub struct ApiKeyRepository {
    pool: PgPool,
}

impl ApiKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn count_for_user(&self, user_id: Uuid) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM api_keys WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn insert(&self, key: &ApiKey) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO api_keys (id, user_id, name, public, key_hash, covered_skylinks, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(key.id)
        .bind(key.user_id)
        .bind(&key.name)
        .bind(key.public)
        .bind(&key.key_hash)
        .bind(&key.covered_skylinks)
        .bind(key.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ApiKey>, RepositoryError> {
        let rows = sqlx::query_as(
            "SELECT id, user_id, name, public, key_hash, covered_skylinks, created_at FROM api_keys WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_owned(&self, user_id: Uuid, id: Uuid) -> Result<Option<ApiKey>, RepositoryError> {
        let row = sqlx::query_as(
            "SELECT id, user_id, name, public, key_hash, covered_skylinks, created_at FROM api_keys WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Per §4's design notes / Open Questions: private keys are immutable
    /// except for deletion — only a public key's name/covered-skylinks
    /// are updatable here. Callers enforce `!key.public => reject` before
    /// calling this.
    pub async fn update_public_key(
        &self,
        id: Uuid,
        name: Option<&str>,
        covered_skylinks: Option<&[String]>,
    ) -> Result<ApiKey, RepositoryError> {
        let row = sqlx::query_as(
            r#"
            UPDATE api_keys SET
                name = COALESCE($1, name),
                covered_skylinks = COALESCE($2, covered_skylinks)
            WHERE id = $3
            RETURNING id, user_id, name, public, key_hash, covered_skylinks, created_at
            "#,
        )
        .bind(name)
        .bind(covered_skylinks.map(|s| Json(s.to_vec())))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or(RepositoryError::NotFound)
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
