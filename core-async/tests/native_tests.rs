//! Integration tests for the core-async facade.
//!
//! These exercise the primitives the player control loop relies on: spawned
//! completions over unbounded channels, watch snapshots, cancellation and
//! periodic ticking.

use core_async::periodic::PeriodicTask;
use core_async::{sync, task, time};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn test_task_spawn() {
    let handle = task::spawn(async { 42 });
    let result = handle.await.unwrap();
    assert_eq!(result, 42);
}

#[tokio::test]
async fn test_timeout_success() {
    let result = time::timeout(time::Duration::from_millis(100), async {
        time::sleep(time::Duration::from_millis(10)).await;
        42
    })
    .await;

    assert_eq!(result.unwrap(), 42);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_failure() {
    let result = time::timeout(time::Duration::from_millis(10), async {
        time::sleep(time::Duration::from_millis(100)).await;
        42
    })
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_completion_queue_from_background_tasks() {
    let (tx, mut rx) = sync::mpsc::unbounded_channel();

    for attempt in 1..=3u64 {
        let tx = tx.clone();
        task::spawn(async move {
            tx.send(attempt).unwrap();
        });
    }
    drop(tx);

    let mut received = Vec::new();
    while let Some(attempt) = rx.recv().await {
        received.push(attempt);
    }
    received.sort_unstable();

    assert_eq!(received, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_oneshot_reply() {
    let (tx, rx) = sync::oneshot::channel();

    task::spawn(async move {
        tx.send("applied").unwrap();
    });

    assert_eq!(rx.await.unwrap(), "applied");
}

#[tokio::test]
async fn test_watch_keeps_latest_value() {
    let (tx, rx) = sync::watch::channel(0u64);

    tx.send(1_000).unwrap();
    tx.send(1_500).unwrap();

    assert_eq!(*rx.borrow(), 1_500);
}

#[tokio::test]
async fn test_cancellation_token_wakes_waiters() {
    let token = sync::CancellationToken::new();
    let child = token.child_token();

    let waiter = task::spawn(async move {
        child.cancelled().await;
        "cancelled"
    });

    token.cancel();
    assert_eq!(waiter.await.unwrap(), "cancelled");
}

#[tokio::test(start_paused = true)]
async fn test_periodic_task_stops_on_drop() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ticks);

    let periodic = PeriodicTask::spawn(
        "drop-test",
        time::Duration::from_millis(500),
        sync::CancellationToken::new(),
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        },
    );
    assert_eq!(periodic.name(), "drop-test");
    assert_eq!(periodic.period(), time::Duration::from_millis(500));

    time::sleep(time::Duration::from_millis(1_100)).await;
    drop(periodic);
    time::sleep(time::Duration::from_millis(2_000)).await;

    assert_eq!(ticks.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_yield_now() {
    task::yield_now().await;
}
