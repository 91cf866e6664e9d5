//! Write-conflict retry wrapper, per §4.5/§7: a transactional write that
//! fails with a Postgres serialization failure or deadlock (SQLSTATE
//! `40001`/`40P01`) is retried, not surfaced to the caller.

use std::future::Future;

use meridian_common::db::is_write_conflict;

/// Retried at most this many times beyond the first attempt — three
/// attempts total.
const MAX_RETRIES: u32 = 2;

/// Runs `op` and retries it on write conflict. `op` owns everything it
/// needs (typically a cloned `PgPool`) and is responsible for opening and
/// committing its own transaction on each attempt — a failed attempt's
/// transaction never escapes this function, so there's nothing to roll
/// back here.
pub async fn with_retry<F, Fut, T>(mut op: F) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut attempts = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempts < MAX_RETRIES && is_write_conflict(&err) => {
                attempts += 1;
                continue;
            }
            Err(err) => return Err(err),
        }
    }
}
