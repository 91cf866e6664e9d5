//! User repository: the data access layer's `users` collection, per §3/§6.

use sqlx::PgPool;
use uuid::Uuid;

use meridian_common::db::RepositoryError;

use crate::domain::entities::User;

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as(
            r#"
            SELECT id, sub, email, tier, quota_exceeded, subscription_status,
                   subscribed_until, subscription_cancel_at, cancel_at_period_end,
                   payment_customer_id, email_confirmation_token,
                   email_confirmation_expires_at, created_at, updated_at
            FROM users WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// JIT creation by `sub` for non-JWT identity flows (key-based
    /// registration, per §4.8). `ON CONFLICT DO NOTHING` handles two
    /// concurrent first-sightings of the same subject the same way
    /// `AuthBackend::provision_user` does for the JWT path.
    pub async fn provision_by_sub(&self, sub: &str) -> Result<User, RepositoryError> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO users (id, sub, email, tier, quota_exceeded, created_at, updated_at)
            VALUES ($1, $2, NULL, $3, false, NOW(), NOW())
            ON CONFLICT (sub) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(sub)
        .bind(meridian_auth::Tier::Free)
        .execute(&self.pool)
        .await?;

        self.get_by_sub(sub).await?.ok_or(RepositoryError::NotFound)
    }

    pub async fn get_by_sub(&self, sub: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as(
            r#"
            SELECT id, sub, email, tier, quota_exceeded, subscription_status,
                   subscribed_until, subscription_cancel_at, cancel_at_period_end,
                   payment_customer_id, email_confirmation_token,
                   email_confirmation_expires_at, created_at, updated_at
            FROM users WHERE sub = $1
            "#,
        )
        .bind(sub)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Set the payment-provider customer id, one-shot per §6 (`PUT
    /// /user`). Rejected as `AlreadyAssigned` (§7 `unprocessable`, not
    /// `conflict` — that kind is reserved for registration's unique
    /// violation) if the user already carries a customer id.
    pub async fn set_payment_customer_id(
        &self,
        user_id: Uuid,
        customer_id: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET payment_customer_id = $1, updated_at = NOW() WHERE id = $2 AND payment_customer_id IS NULL",
        )
        .bind(customer_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::AlreadyAssigned(
                "payment customer id already set".to_string(),
            ));
        }
        Ok(())
    }

    /// Deletes a user and every row owned by it, per §3's "Ownership":
    /// uploads, downloads, registry events, API keys, and public-key
    /// bindings cascade; shared skylinks are left untouched.
    pub async fn delete_cascade(&self, user_id: Uuid) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM uploads WHERE user_id = $1").bind(user_id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM downloads WHERE user_id = $1").bind(user_id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM registry_reads WHERE user_id = $1").bind(user_id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM registry_writes WHERE user_id = $1").bind(user_id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM api_keys WHERE user_id = $1").bind(user_id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM public_key_bindings WHERE user_id = $1").bind(user_id).execute(&mut *tx).await?;
        let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(user_id).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        tx.commit().await?;
        Ok(())
    }
}
