//! Configuration management following 12-factor app principles.
//!
//! All configuration is loaded from environment variables so that the
//! running process and its image are identical across environments.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Postgres connection string.
    pub database_url: String,

    /// Public-facing portal domain, used by the challenge service's
    /// `recipient` check and the cookie's domain attribute default.
    pub portal_domain: String,
    /// Domain this process itself answers on, if different from
    /// `portal_domain` (reverse-proxied deployments).
    pub server_domain: Option<String>,

    /// Path to the local JWKS file holding this portal's signer keys.
    pub jwks_path: String,

    /// Cookie attributes and sealing keys. Hash/encryption keys must each
    /// be at least 32 bytes; rejected at load time otherwise.
    pub cookie_domain: String,
    pub cookie_hash_key: String,
    pub cookie_encryption_key: String,

    /// Payment-provider (Stripe-shaped) API key and webhook signing secret.
    pub payment_provider_key: String,
    pub payment_provider_webhook_secret: String,

    /// Base URL of the content-hosting storage backend the metadata
    /// fetcher issues HEAD requests against.
    pub storage_backend_url: String,

    /// Email dispatch collaborator (out of scope per the core, but the
    /// process still needs to know where to reach it).
    pub email_uri: Option<String>,
    pub email_from: Option<String>,

    /// Token lifetime, default 720h (30 days).
    pub jwt_ttl: Duration,
    /// Max API keys per user, default 1000.
    pub max_api_keys_per_user: u32,

    pub log_level: String,

    pub db_timeout: Duration,
    pub http_timeout: Duration,

    /// Metadata-fetcher bounded queue capacity, default 1000.
    pub fetcher_queue_capacity: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("portal_domain", &self.portal_domain)
            .field("server_domain", &self.server_domain)
            .field("jwks_path", &self.jwks_path)
            .field("cookie_domain", &self.cookie_domain)
            .field("cookie_hash_key", &"[REDACTED]")
            .field("cookie_encryption_key", &"[REDACTED]")
            .field("payment_provider_key", &"[REDACTED]")
            .field("payment_provider_webhook_secret", &"[REDACTED]")
            .field("storage_backend_url", &self.storage_backend_url)
            .field("email_uri", &self.email_uri)
            .field("email_from", &self.email_from)
            .field("jwt_ttl", &self.jwt_ttl)
            .field("max_api_keys_per_user", &self.max_api_keys_per_user)
            .field("log_level", &self.log_level)
            .field("db_timeout", &self.db_timeout)
            .field("http_timeout", &self.http_timeout)
            .field("fetcher_queue_capacity", &self.fetcher_queue_capacity)
            .finish()
    }
}

const MIN_COOKIE_KEY_BYTES: usize = 32;

impl Config {
    /// Load configuration from environment variables, loading a `.env`
    /// file first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let cookie_hash_key = env::var("COOKIE_HASH_KEY")
            .context("COOKIE_HASH_KEY is required")?;
        let cookie_encryption_key = env::var("COOKIE_ENCRYPTION_KEY")
            .context("COOKIE_ENCRYPTION_KEY is required")?;
        if cookie_hash_key.len() < MIN_COOKIE_KEY_BYTES {
            return Err(anyhow!(
                "COOKIE_HASH_KEY must be at least {} bytes",
                MIN_COOKIE_KEY_BYTES
            ));
        }
        if cookie_encryption_key.len() < MIN_COOKIE_KEY_BYTES {
            return Err(anyhow!(
                "COOKIE_ENCRYPTION_KEY must be at least {} bytes",
                MIN_COOKIE_KEY_BYTES
            ));
        }

        let database_url = match env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                let host = env::var("DB_HOST").context("DB_HOST is required")?;
                let port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
                let user = env::var("DB_USER").context("DB_USER is required")?;
                let pass = env::var("DB_PASS").context("DB_PASS is required")?;
                let name = env::var("DB_NAME").unwrap_or_else(|_| "meridian".to_string());
                format!("postgres://{user}:{pass}@{host}:{port}/{name}")
            }
        };

        let jwt_ttl_hours: u64 = env::var("JWT_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(720);

        let db_timeout_secs: u64 = env::var("DB_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);
        let http_timeout_secs: u64 = env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        Ok(Self {
            database_url,
            portal_domain: env::var("PORTAL_DOMAIN").context("PORTAL_DOMAIN is required")?,
            server_domain: env::var("SERVER_DOMAIN").ok(),
            jwks_path: env::var("JWKS_PATH").unwrap_or_else(|_| "jwks.json".to_string()),
            cookie_domain: env::var("COOKIE_DOMAIN").unwrap_or_else(|_| "localhost".to_string()),
            cookie_hash_key,
            cookie_encryption_key,
            payment_provider_key: env::var("PAYMENT_PROVIDER_KEY").unwrap_or_default(),
            payment_provider_webhook_secret: env::var("PAYMENT_PROVIDER_WEBHOOK_SECRET")
                .unwrap_or_default(),
            storage_backend_url: env::var("STORAGE_BACKEND_URL")
                .context("STORAGE_BACKEND_URL is required")?,
            email_uri: env::var("EMAIL_URI").ok(),
            email_from: env::var("EMAIL_FROM").ok(),
            jwt_ttl: Duration::from_secs(jwt_ttl_hours * 3600),
            max_api_keys_per_user: env::var("MAX_API_KEYS_PER_USER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_timeout: Duration::from_secs(db_timeout_secs),
            http_timeout: Duration::from_secs(http_timeout_secs),
            fetcher_queue_capacity: env::var("FETCHER_QUEUE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
        })
    }
}
