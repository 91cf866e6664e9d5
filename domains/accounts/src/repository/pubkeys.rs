//! Public-key binding repository, per §4.8/§6 (`GET/POST
//! /user/pubkey/register`, `DELETE /user/pubkey/:pk`).

use sqlx::PgPool;
use uuid::Uuid;

use meridian_common::db::RepositoryError;

use crate::domain::entities::PublicKeyBinding;

#[derive(Clone)]
pub struct PublicKeyRepository {
    pool: PgPool,
}

impl PublicKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn bind(&self, user_id: Uuid, public_key_hex: &str) -> Result<PublicKeyBinding, RepositoryError> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO public_key_bindings (id, user_id, public_key, created_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (public_key) DO NOTHING
            RETURNING id, user_id, public_key, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(public_key_hex)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or_else(|| RepositoryError::AlreadyExists)
    }

    pub async fn find_by_key(&self, public_key_hex: &str) -> Result<Option<PublicKeyBinding>, RepositoryError> {
        let row = sqlx::query_as(
            "SELECT id, user_id, public_key, created_at FROM public_key_bindings WHERE public_key = $1",
        )
        .bind(public_key_hex)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn unbind(&self, user_id: Uuid, public_key_hex: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM public_key_bindings WHERE user_id = $1 AND public_key = $2")
            .bind(user_id)
            .bind(public_key_hex)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
