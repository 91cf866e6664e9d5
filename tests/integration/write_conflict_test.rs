//! §8 scenario 6: a genuine Postgres SERIALIZABLE write-skew conflict,
//! and confirmation that [`with_retry`] retries and succeeds across it —
//! the repository layer's own unit tests can only exercise the
//! non-conflict path with a synthetic error, since a real SQLSTATE
//! requires a live connection.

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use meridian_accounts::repository::conflict::with_retry;
use meridian_auth::Tier;

use common::TestApp;

/// The textbook write-skew anomaly (PostgreSQL's own docs use two
/// on-call doctors): two transactions each read the *same pair* of rows
/// and then write to different ones of that pair. Under SERIALIZABLE
/// isolation Postgres detects the rw-conflict cycle and aborts whichever
/// commits second with SQLSTATE `40001`.
#[tokio::test]
async fn write_skew_conflict_is_retried_and_succeeds() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let user1 = app.seed_user("sub-conflict-1", None, Tier::Free).await;
    let user2 = app.seed_user("sub-conflict-2", None, Tier::Free).await;

    let barrier = Arc::new(tokio::sync::Barrier::new(2));

    // The "victim" transaction: reads both rows, then flips user1, and
    // commits promptly once released from the barrier.
    let victim = {
        let pool = app.pool.clone();
        let barrier = barrier.clone();
        let user1_id = user1.id;
        let user2_id = user2.id;
        tokio::spawn(async move {
            let mut tx = pool.begin().await.expect("begin victim tx");
            sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
                .execute(&mut *tx)
                .await
                .expect("set isolation");
            let _rows: Vec<(uuid::Uuid, bool)> =
                sqlx::query_as("SELECT id, quota_exceeded FROM users WHERE id = ANY($1)")
                    .bind(&[user1_id, user2_id][..])
                    .fetch_all(&mut *tx)
                    .await
                    .expect("read both rows");

            barrier.wait().await;

            sqlx::query("UPDATE users SET quota_exceeded = true, updated_at = NOW() WHERE id = $1")
                .bind(user1_id)
                .execute(&mut *tx)
                .await
                .expect("update user1");
            tx.commit().await
        })
    };

    let attempts = Arc::new(AtomicU32::new(0));
    let pool = app.pool.clone();
    let barrier_op = barrier.clone();
    let attempts_op = attempts.clone();
    let user1_id = user1.id;
    let user2_id = user2.id;

    let result = with_retry(move || {
        let pool = pool.clone();
        let barrier = barrier_op.clone();
        let attempts = attempts_op.clone();
        async move {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                let mut tx = pool.begin().await?;
                sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
                    .execute(&mut *tx)
                    .await?;
                let _rows: Vec<(uuid::Uuid, bool)> =
                    sqlx::query_as("SELECT id, quota_exceeded FROM users WHERE id = ANY($1)")
                        .bind(&[user1_id, user2_id][..])
                        .fetch_all(&mut *tx)
                        .await?;

                barrier.wait().await;
                // Give the victim a clear run at committing first, so
                // this side is the one Postgres detects the cycle
                // against and aborts.
                tokio::time::sleep(Duration::from_millis(50)).await;

                sqlx::query("UPDATE users SET quota_exceeded = true, updated_at = NOW() WHERE id = $1")
                    .bind(user2_id)
                    .execute(&mut *tx)
                    .await?;
                tx.commit().await
            } else {
                // The victim has already committed by the time we're
                // retried; a fresh, uncontended attempt just succeeds.
                sqlx::query("UPDATE users SET quota_exceeded = true, updated_at = NOW() WHERE id = $1")
                    .bind(user2_id)
                    .execute(&pool)
                    .await
                    .map(|_| ())
            }
        }
    })
    .await;

    victim.await.expect("victim task panicked").expect("victim tx commits");

    assert!(result.is_ok(), "with_retry should recover from the write-skew conflict: {result:?}");
    assert!(
        attempts.load(Ordering::SeqCst) >= 2,
        "expected at least one retry after the initial conflict"
    );

    let (u1_exceeded, u2_exceeded): (bool, bool) = (
        sqlx::query_scalar("SELECT quota_exceeded FROM users WHERE id = $1")
            .bind(user1_id)
            .fetch_one(&app.pool)
            .await
            .unwrap(),
        sqlx::query_scalar("SELECT quota_exceeded FROM users WHERE id = $1")
            .bind(user2_id)
            .fetch_one(&app.pool)
            .await
            .unwrap(),
    );
    assert!(u1_exceeded);
    assert!(u2_exceeded);

    app.cleanup().await;
}

/// An uncontended tracked write goes through `with_retry`'s single
/// happy-path attempt with no special handling needed.
#[tokio::test]
async fn uncontended_tracked_event_succeeds_on_first_attempt() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");

    let (status, _) = app
        .request(
            axum::http::Request::builder()
                .method("POST")
                .uri("/track/registry/read")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, 204);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM registry_reads")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    app.cleanup().await;
}
