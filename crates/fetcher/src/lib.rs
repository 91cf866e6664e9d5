//! The metadata fetcher: a bounded-concurrency background worker that
//! HEADs the storage backend to learn the size and filename of uploads
//! whose size is still unknown (§4.7).
//!
//! Unlike the request-scoped collaborators elsewhere in this workspace,
//! this component doesn't wrap an external workflow engine — it *is* the
//! worker. It owns a bounded `tokio::mpsc` channel (capacity from
//! configuration, default 1000) and spawns one task per message so
//! processing is genuinely concurrent, matching "processed concurrently...
//! a fresh task per message."

pub mod metadata;

use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("non-success status {0}")]
    Status(u16),
    #[error("missing or malformed metadata header")]
    MalformedMetadata,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct FetchMessage {
    pub skylink_id: Uuid,
    pub fingerprint: String,
    pub attempts: u32,
}

#[derive(Clone)]
pub struct FetcherConfig {
    pub capacity: usize,
    pub storage_backend_url: String,
    pub user_agent: String,
    pub max_attempts: u32,
}

impl FetcherConfig {
    pub fn from_common(config: &meridian_common::Config) -> Self {
        Self {
            capacity: config.fetcher_queue_capacity,
            storage_backend_url: config.storage_backend_url.clone(),
            user_agent: "Meridian-Metadata-Fetcher/1.0".to_string(),
            max_attempts: 3,
        }
    }
}

/// Handle used by the handler layer to enqueue a fetch without blocking on
/// channel capacity — the send itself runs in its own task, so a momentary
/// full queue never stalls the request path.
#[derive(Clone)]
pub struct MetadataFetcher {
    sender: mpsc::Sender<FetchMessage>,
}

impl MetadataFetcher {
    pub fn enqueue(&self, message: FetchMessage) {
        let sender = self.sender.clone();
        tokio::spawn(async move {
            if sender.send(message).await.is_err() {
                tracing::warn!("metadata fetcher channel closed, dropping message");
            }
        });
    }
}

/// Start the fetcher's dispatcher task. Returns a cheaply-cloneable handle
/// for enqueueing and the dispatcher's `JoinHandle` for the caller's own
/// shutdown bookkeeping.
pub fn spawn(
    pool: PgPool,
    http: reqwest::Client,
    config: FetcherConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> (MetadataFetcher, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel(config.capacity);
    let config = Arc::new(config);
    let retry_tx = tx.clone();

    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("metadata fetcher received shutdown signal, draining best-effort");
                    break;
                }
                maybe_message = rx.recv() => {
                    match maybe_message {
                        Some(message) => {
                            let pool = pool.clone();
                            let http = http.clone();
                            let config = config.clone();
                            let retry_tx = retry_tx.clone();
                            tokio::spawn(async move {
                                process_message(message, &pool, &http, &config, &retry_tx).await;
                            });
                        }
                        None => break,
                    }
                }
            }
        }
    });

    (MetadataFetcher { sender: tx }, handle)
}

async fn process_message(
    mut message: FetchMessage,
    pool: &PgPool,
    http: &reqwest::Client,
    config: &FetcherConfig,
    retry_tx: &mpsc::Sender<FetchMessage>,
) {
    match try_fetch(&message, pool, http, config).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::trace!(skylink = %message.fingerprint, "skylink size already known, skipping");
        }
        Err(err) => {
            message.attempts += 1;
            if message.attempts >= config.max_attempts {
                tracing::warn!(
                    skylink = %message.fingerprint,
                    attempts = message.attempts,
                    error = %err,
                    "dropping metadata fetch after exhausting retries"
                );
            } else {
                tracing::debug!(
                    skylink = %message.fingerprint,
                    attempts = message.attempts,
                    error = %err,
                    "metadata fetch failed, re-enqueueing"
                );
                let _ = retry_tx.send(message).await;
            }
        }
    }
}

/// Returns `Ok(true)` if the size/filename were updated, `Ok(false)` if the
/// skylink's size was already known (message dropped, no-op).
async fn try_fetch(
    message: &FetchMessage,
    pool: &PgPool,
    http: &reqwest::Client,
    config: &FetcherConfig,
) -> Result<bool, FetchError> {
    let known_size: Option<i64> =
        sqlx::query_scalar("SELECT size FROM skylinks WHERE id = $1")
            .bind(message.skylink_id)
            .fetch_optional(pool)
            .await?;

    if known_size.unwrap_or(0) != 0 {
        return Ok(false);
    }

    let url = format!(
        "{}/skynet/skylink/{}",
        config.storage_backend_url.trim_end_matches('/'),
        message.fingerprint
    );

    let response = http
        .head(&url)
        .header(reqwest::header::USER_AGENT, &config.user_agent)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(FetchError::Status(response.status().as_u16()));
    }

    let parsed = metadata::parse_headers(response.headers()).ok_or(FetchError::MalformedMetadata)?;

    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE skylinks SET filename = $1, size = $2 WHERE id = $3")
        .bind(&parsed.filename)
        .bind(parsed.length)
        .bind(message.skylink_id)
        .execute(&mut *tx)
        .await?;

    // Back-fill any prior zero-byte download reports of this skylink —
    // those rows recorded "unknown size at the time" and should reflect
    // the now-known length.
    sqlx::query("UPDATE downloads SET bytes = $1 WHERE skylink_id = $2 AND bytes = 0")
        .bind(parsed.length)
        .bind(message.skylink_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(true)
}
