//! Meridian Accounts application composition root
//!
//! Wires the accounts domain's router to its collaborators — the auth
//! backend, the payment provider, the metadata fetcher, the email
//! service — and to the shared infrastructure layers (CORS, body-size
//! limit, tracing) every deployment target needs.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use meridian_accounts::{AccountsRepositories, AccountsState, TierCache};
use meridian_auth::{AuthBackend, AuthConfig};
use meridian_common::Config;
use meridian_email::{EmailConfig, EmailServiceFactory};
use meridian_fetcher::{FetcherConfig, MetadataFetcher};
use meridian_payments::{PaymentProviderConfig, PaymentProviderFactory};
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

/// Request body limit applied ahead of every route — uploads themselves
/// go straight to the storage backend, so this process only ever handles
/// small control-plane payloads.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Everything `create_app` spun up that the binary needs to hold onto
/// for its own shutdown bookkeeping.
pub struct App {
    pub router: Router,
    pub shutdown_tx: broadcast::Sender<()>,
    pub fetcher_task: JoinHandle<()>,
}

/// Create the accounts API router with all routes and middleware.
pub async fn create_app(config: Config, pool: PgPool) -> Result<App, anyhow::Error> {
    let repos = AccountsRepositories::new(pool.clone());

    let auth_config = AuthConfig::from(&config);
    let auth = AuthBackend::new(pool.clone(), auth_config)?;

    let payment_config = PaymentProviderConfig::from_env()?;
    let payments = Arc::from(PaymentProviderFactory::create(payment_config)?);

    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;
    let fetcher_config = FetcherConfig::from_common(&config);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let (fetcher, fetcher_task): (MetadataFetcher, JoinHandle<()>) =
        meridian_fetcher::spawn(pool.clone(), http_client, fetcher_config, shutdown_rx);

    let email_config = EmailConfig::from_env()?;
    let email = Arc::from(EmailServiceFactory::create(email_config).await?);

    let state = AccountsState {
        repos,
        auth,
        payments,
        fetcher,
        tier_cache: TierCache::new(),
        email,
        portal_name: config.portal_domain.clone(),
        max_api_keys_per_user: config.max_api_keys_per_user,
    };

    let router = meridian_accounts::routes().with_state(state);

    Ok(App {
        router,
        shutdown_tx,
        fetcher_task,
    })
}

/// `Access-Control-Allow-Origin` layer parsed from a comma-separated list
/// of allowed origins.
pub fn build_cors_layer(origins: &str) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| o.parse().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("no valid CORS origins configured, falling back to permissive");
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Caps request bodies well above the largest legitimate control-plane
/// payload (an API key's `coveredSkylinks` list) and far below anything
/// that would let a caller use this process as an upload path.
pub fn body_limit_layer() -> RequestBodyLimitLayer {
    RequestBodyLimitLayer::new(MAX_BODY_BYTES)
}
