//! Skylink repository: the data access layer's `skylinks` collection.
//!
//! Skylinks are shared across users (§3 "Ownership": "their lifetime is
//! the longest holder's") so this repository never deletes one.

use sqlx::PgPool;
use uuid::Uuid;

use meridian_common::db::RepositoryError;

use crate::domain::entities::Skylink;

#[derive(Clone)]
pub struct SkylinkRepository {
    pool: PgPool,
}

impl SkylinkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Skylink>, RepositoryError> {
        let row = sqlx::query_as("SELECT id, fingerprint, filename, size, created_at FROM skylinks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn get_by_fingerprint(&self, fingerprint: &str) -> Result<Option<Skylink>, RepositoryError> {
        let row = sqlx::query_as(
            "SELECT id, fingerprint, filename, size, created_at FROM skylinks WHERE fingerprint = $1",
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Get-or-create by fingerprint, per §3 "created on first upload or
    /// download report." `ON CONFLICT DO NOTHING` handles the race of two
    /// concurrent first-sightings of the same fingerprint.
    pub async fn get_or_create(&self, fingerprint: &str) -> Result<Skylink, RepositoryError> {
        if !Skylink::is_valid_fingerprint(fingerprint) {
            return Err(RepositoryError::InvalidData(format!(
                "invalid skylink fingerprint: {fingerprint}"
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO skylinks (id, fingerprint, filename, size, created_at)
            VALUES ($1, $2, NULL, 0, NOW())
            ON CONFLICT (fingerprint) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(fingerprint)
        .execute(&self.pool)
        .await?;

        self.get_by_fingerprint(fingerprint)
            .await?
            .ok_or(RepositoryError::NotFound)
    }
}
