//! The concrete credential resolver.
//!
//! Wraps a `PgPool`, the loaded JWKS, and the cookie-sealing key, exposing
//! the resolution pipeline described in §4.1. Domain states expose this
//! via `FromRef`, the same nested-state pattern used throughout the rest
//! of the workspace:
//!
//! ```ignore
//! impl FromRef<AccountsState> for AuthBackend {
//!     fn from_ref(state: &AccountsState) -> Self {
//!         state.auth.clone()
//!     }
//! }
//! ```

use std::sync::Arc;

use axum::http::{HeaderMap, Method};
use axum_extra::extract::cookie::Key;
use jsonwebtoken::jwk::JwkSet;
use sqlx::PgPool;
use uuid::Uuid;

use crate::claims::PortalClaims;
use crate::config::AuthConfig;
use crate::cookie::COOKIE_NAME;
use crate::error::AuthError;
use crate::jwks;
use crate::types::{ResolvedApiKey, ResolvedUser, Tier};

const API_KEY_HEADER: &str = "Skynet-API-Key";
const API_KEY_QUERY_PARAM: &str = "apiKey";

#[derive(sqlx::FromRow)]
struct ApiKeyRow {
    id: Uuid,
    user_id: Uuid,
    public: bool,
    key_hash: String,
    covered_skylinks: serde_json::Value,
    created_at: chrono::DateTime<chrono::Utc>,
}

/// What the resolver extracted from the request, before the user row is
/// known. Carried through so handlers can synthesize a uniform token
/// shape even when the caller authenticated with an API key.
#[derive(Debug, Clone)]
pub enum VerifiedToken {
    Jwt(PortalClaims),
    /// An API key was exchanged for a token; downstream handlers see the
    /// same `ResolvedUser` shape regardless of path.
    ApiKey(Uuid),
}

#[derive(Clone)]
pub struct AuthBackend {
    pool: PgPool,
    config: AuthConfig,
    jwks: Arc<JwkSet>,
    cookie_key: Key,
}

impl AuthBackend {
    pub fn new(pool: PgPool, config: AuthConfig) -> anyhow::Result<Self> {
        let jwks = jwks::load_jwks(&config.jwks_path)?;
        let cookie_key = crate::cookie::derive_cookie_key(
            &config.cookie_hash_key,
            &config.cookie_encryption_key,
        );
        Ok(Self {
            pool,
            config,
            jwks: Arc::new(jwks),
            cookie_key,
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn cookie_key(&self) -> &Key {
        &self.cookie_key
    }

    pub fn public_jwks(&self) -> &JwkSet {
        &self.jwks
    }

    /// The full credential resolution pipeline of §4.1: API key sources
    /// are tried first, then bearer token, then the secure cookie.
    /// `allows_api_key` gates whether an API key is accepted at all,
    /// resolving the "one variant admits private keys everywhere" open
    /// question in favor of the stricter flag-gated behavior.
    pub async fn resolve(
        &self,
        headers: &HeaderMap,
        query: &str,
        method: &Method,
        path: &str,
        cookie_value: Option<&str>,
        allows_api_key: bool,
    ) -> Result<(ResolvedUser, VerifiedToken), AuthError> {
        if let Some(candidate) = extract_api_key_candidate(headers, query) {
            if !allows_api_key {
                return Err(AuthError::APIKeyNotAllowed);
            }
            let key = self.authenticate_api_key(&candidate).await?;
            if key.public {
                let fingerprint =
                    extract_fingerprint(path).ok_or(AuthError::InvalidAPIKey)?;
                if *method != Method::GET || !key.covered_skylinks.iter().any(|s| s == fingerprint)
                {
                    return Err(AuthError::InvalidAPIKey);
                }
            }
            let user = self.find_by_id(key.user_id).await?.ok_or(AuthError::UserNotFound)?;
            return Ok((user, VerifiedToken::ApiKey(key.id)));
        }

        let bearer = extract_bearer(headers);
        let token_str = match bearer {
            Some(t) => Some(t),
            None => cookie_value.map(|s| s.to_string()),
        };

        let Some(token_str) = token_str else {
            return Err(AuthError::NoToken);
        };

        let claims = jwks::validate_token(&token_str, &self.jwks, &self.config.issuer)?;
        let user = self.resolve_or_provision(&claims).await?;
        Ok((user, VerifiedToken::Jwt(claims)))
    }

    async fn resolve_or_provision(&self, claims: &PortalClaims) -> Result<ResolvedUser, AuthError> {
        if let Some(mut user) = self.find_by_sub(&claims.sub).await? {
            if user.email.as_deref() != claims.email.as_deref() {
                self.refresh_email(user.id, claims.email.as_deref()).await?;
                user.email = claims.email.clone();
            }
            return Ok(user);
        }

        self.provision_user(&claims.sub, claims.email.as_deref()).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ResolvedUser>, AuthError> {
        let user: Option<ResolvedUser> = sqlx::query_as(
            "SELECT id, sub, email, tier, quota_exceeded FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_sub(&self, sub: &str) -> Result<Option<ResolvedUser>, AuthError> {
        let user: Option<ResolvedUser> = sqlx::query_as(
            "SELECT id, sub, email, tier, quota_exceeded FROM users WHERE sub = $1",
        )
        .bind(sub)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn refresh_email(&self, id: Uuid, email: Option<&str>) -> Result<(), AuthError> {
        sqlx::query("UPDATE users SET email = $1, updated_at = NOW() WHERE id = $2")
            .bind(email)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// JIT user creation on first sighting by `sub`. `ON CONFLICT DO
    /// NOTHING` handles the race of two concurrent first-requests for the
    /// same subject.
    async fn provision_user(
        &self,
        sub: &str,
        email: Option<&str>,
    ) -> Result<ResolvedUser, AuthError> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO users (id, sub, email, tier, quota_exceeded, created_at, updated_at)
            VALUES ($1, $2, $3, $4, false, NOW(), NOW())
            ON CONFLICT (sub) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(sub)
        .bind(email)
        .bind(Tier::Free)
        .execute(&self.pool)
        .await?;

        self.find_by_sub(sub)
            .await?
            .ok_or(AuthError::Internal)
    }

    async fn authenticate_api_key(&self, candidate: &str) -> Result<ResolvedApiKey, AuthError> {
        let rows: Vec<ApiKeyRow> = sqlx::query_as(
            "SELECT id, user_id, public, key_hash, covered_skylinks, created_at FROM api_keys",
        )
        .fetch_all(&self.pool)
        .await?;

        for row in rows {
            if meridian_common::crypto::verify_key_hash(candidate, &row.key_hash) {
                let covered_skylinks: Vec<String> =
                    serde_json::from_value(row.covered_skylinks).unwrap_or_default();
                return Ok(ResolvedApiKey {
                    id: row.id,
                    user_id: row.user_id,
                    public: row.public,
                    covered_skylinks,
                    created_at: row.created_at,
                });
            }
        }

        Err(AuthError::InvalidAPIKey)
    }
}

fn extract_api_key_candidate(headers: &HeaderMap, query: &str) -> Option<String> {
    if let Some(value) = headers.get(API_KEY_HEADER) {
        return value.to_str().ok().map(|s| s.to_string());
    }
    query_param(query, API_KEY_QUERY_PARAM)
}

fn query_param(query: &str, name: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let value = header.to_str().ok()?;
    value.strip_prefix("Bearer ").map(|t| t.to_string())
}

/// Pull the skylink fingerprint out of a request path such as
/// `/user/limits/<fingerprint>` or `/track/upload/<fingerprint>` — the
/// last path segment.
fn extract_fingerprint(path: &str) -> Option<&str> {
    path.trim_end_matches('/').rsplit('/').next().filter(|s| !s.is_empty())
}
