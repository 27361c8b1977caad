//! Needs a local Postgres (see `common::setup_pool`). Run with
//! `cargo test -- --ignored`.

mod common;

use common::*;
use pay_sync::domain::job::Job;
use pay_sync::domain::payment::{PaymentStatus, StatusChange};
use pay_sync::domain::store::{JobStore, PaymentStore};
use pay_sync::infra::postgres::{PgJobStore, PgStore};
use std::time::Duration;

// ── 1. insert_and_read_back ────────────────────────────────────────────────

#[tokio::test]
#[ignore = "needs postgres"]
async fn insert_and_read_back() {
    let pool = setup_pool("pay_sync_test_repo").await;
    let store = PgStore::new(pool);

    store.insert_payment(&make_payment("pg_read", 0)).await.unwrap();
    let payment = store.get_payment(&pid("pg_read")).await.unwrap().unwrap();

    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.money, rub(10_000));
    assert_eq!(payment.description, "Order #O1");
    assert!(
        store
            .payment_ids_by_status(PaymentStatus::Pending)
            .await
            .unwrap()
            .contains(&pid("pg_read"))
    );
}

// ── 2. status_writes_are_monotonic ─────────────────────────────────────────

#[tokio::test]
#[ignore = "needs postgres"]
async fn status_writes_are_monotonic() {
    let pool = setup_pool("pay_sync_test_repo").await;
    let store = PgStore::new(pool);
    store.insert_payment(&make_payment("pg_mono", 0)).await.unwrap();
    let id = pid("pg_mono");

    let first = store
        .update_payment_status(&id, PaymentStatus::Canceled, Some("insufficient_funds"))
        .await
        .unwrap();
    let again = store
        .update_payment_status(&id, PaymentStatus::Canceled, Some("insufficient_funds"))
        .await
        .unwrap();
    let flip = store
        .update_payment_status(&id, PaymentStatus::Succeeded, None)
        .await
        .unwrap();

    assert_eq!(first, StatusChange::Advanced { from: PaymentStatus::Pending });
    assert_eq!(again, StatusChange::Unchanged);
    assert_eq!(flip, StatusChange::Rejected { current: PaymentStatus::Canceled });

    let stored = store.get_payment(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Canceled);
    assert_eq!(stored.cancellation_reason.as_deref(), Some("insufficient_funds"));
}

// ── 3. concurrent_writers_advance_once ─────────────────────────────────────
// The advisory lock serializes writers: exactly one sees Advanced.

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "needs postgres"]
async fn concurrent_writers_advance_once() {
    let pool = setup_pool("pay_sync_test_repo").await;
    let store = PgStore::new(pool);
    store.insert_payment(&make_payment("pg_race", 0)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .update_payment_status(&pid("pg_race"), PaymentStatus::Succeeded, None)
                .await
                .unwrap()
        }));
    }

    let mut advanced = 0;
    for handle in handles {
        if handle.await.unwrap().advanced() {
            advanced += 1;
        }
    }
    assert_eq!(advanced, 1);
}

// ── 4. unknown_id_is_untracked ─────────────────────────────────────────────

#[tokio::test]
#[ignore = "needs postgres"]
async fn unknown_id_is_untracked() {
    let pool = setup_pool("pay_sync_test_repo").await;
    let store = PgStore::new(pool);

    let change = store
        .update_payment_status(&pid("pg_nobody"), PaymentStatus::Succeeded, None)
        .await
        .unwrap();
    assert_eq!(change, StatusChange::Untracked);
}

// ── 5. job_queue_dedups_claims_and_reaps ───────────────────────────────────

#[tokio::test]
#[ignore = "needs postgres"]
async fn job_queue_dedups_claims_and_reaps() {
    let pool = setup_pool("pay_sync_test_repo").await;
    let jobs = PgJobStore::new(pool.clone());
    let job = Job::CheckPayment {
        payment_id: pid("pg_job"),
    };
    let now = chrono::Utc::now();

    assert!(jobs.enqueue(&job, now).await.unwrap());
    assert!(!jobs.enqueue(&job, now).await.unwrap());
    assert_eq!(job_count(&pool, "check_payment:pg_job").await, 1);

    let claimed = jobs.claim(100).await.unwrap();
    let row = claimed.iter().find(|r| r.job == job).unwrap();

    // Still active while processing.
    assert!(!jobs.enqueue(&job, now).await.unwrap());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(jobs.reap_stale(Duration::ZERO).await.unwrap() >= 1);

    let again = jobs.claim(100).await.unwrap();
    assert!(again.iter().any(|r| r.id == row.id));
    jobs.complete(row.id).await.unwrap();

    // Completed jobs free the key.
    assert!(jobs.enqueue(&job, now).await.unwrap());
    assert_eq!(job_count(&pool, "check_payment:pg_job").await, 2);
}
