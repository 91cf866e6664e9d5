//! Challenge repository, per §3/§4.8.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{Challenge, ChallengeIntent};

#[derive(Clone)]
pub struct ChallengeRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct ChallengeRow {
    id: Uuid,
    public_key: String,
    intent: String,
    nonce: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<ChallengeRow> for Challenge {
    type Error = sqlx::Error;

    fn try_from(row: ChallengeRow) -> Result<Self, Self::Error> {
        let intent = row
            .intent
            .parse::<ChallengeIntent>()
            .map_err(|e| sqlx::Error::Decode(e.to_string().into()))?;
        Ok(Challenge {
            id: row.id,
            public_key: row.public_key,
            intent,
            nonce: row.nonce,
            created_at: row.created_at,
        })
    }
}

impl ChallengeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, challenge: &Challenge) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO challenges (id, public_key, intent, nonce, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(challenge.id)
        .bind(&challenge.public_key)
        .bind(challenge.intent.to_string())
        .bind(&challenge.nonce)
        .bind(challenge.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_nonce(&self, nonce: &str) -> Result<Option<Challenge>, sqlx::Error> {
        let row: Option<ChallengeRow> = sqlx::query_as(
            "SELECT id, public_key, intent, nonce, created_at FROM challenges WHERE nonce = $1",
        )
        .bind(nonce)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Challenge::try_from).transpose()
    }

    /// Single-use per §3/§4.8 — callers delete immediately after a
    /// validation attempt, success or failure alike for an expired
    /// challenge.
    pub async fn delete(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM challenges WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Best-effort periodic cleanup of expired, never-solved challenges.
    /// Not part of §4.8's core contract but keeps the table bounded.
    pub async fn delete_expired(&self, ttl_seconds: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM challenges WHERE created_at < NOW() - ($1 || ' seconds')::interval",
        )
        .bind(ttl_seconds.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
