// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Gate that holds jobs open until released.
struct Gate {
    release: Notify,
}

impl Gate {
    fn new() -> Arc<Self> {
        Arc::new(Self { release: Notify::new() })
    }
}

#[tokio::test]
async fn runs_enqueued_jobs() {
    let pool = SpawnPool::new(2, 4);
    let done = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
        let done = done.clone();
        pool.enqueue(async move {
            done.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }
    tokio::time::timeout(Duration::from_secs(2), async {
        while done.load(Ordering::SeqCst) < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn queue_full_is_reported_immediately() {
    // max_concurrent=1, queue_size=1: one running, one queued, third rejected
    let pool = SpawnPool::new(1, 1);
    let gate = Gate::new();

    let g = gate.clone();
    pool.enqueue(async move { g.release.notified().await }).unwrap();
    // give the worker a moment to move the first job into its slot
    tokio::time::sleep(Duration::from_millis(50)).await;

    let g = gate.clone();
    pool.enqueue(async move { g.release.notified().await }).unwrap();

    let g = gate.clone();
    let err = pool.enqueue(async move { g.release.notified().await }).unwrap_err();
    assert_eq!(err, EnqueueError::QueueFull);

    gate.release.notify_waiters();
    gate.release.notify_waiters();
}

#[tokio::test]
async fn parallelism_never_exceeds_limit() {
    const MAX: usize = 3;
    let pool = SpawnPool::new(MAX, 64);
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicUsize::new(0));

    for _ in 0..20 {
        let active = active.clone();
        let peak = peak.clone();
        let done = done.clone();
        pool.enqueue(async move {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            active.fetch_sub(1, Ordering::SeqCst);
            done.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }

    tokio::time::timeout(Duration::from_secs(5), async {
        while done.load(Ordering::SeqCst) < 20 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert!(peak.load(Ordering::SeqCst) <= MAX, "peak {} > {}", peak.load(Ordering::SeqCst), MAX);
}

#[tokio::test]
async fn admission_is_fifo() {
    let pool = SpawnPool::new(1, 16);
    let order = Arc::new(Mutex::new(Vec::new()));
    for i in 0..5 {
        let order = order.clone();
        pool.enqueue(async move {
            order.lock().push(i);
        })
        .unwrap();
    }
    tokio::time::timeout(Duration::from_secs(2), async {
        while order.lock().len() < 5 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn shutdown_waits_for_launched_tasks_and_rejects_new_work() {
    let pool = SpawnPool::new(2, 4);
    let finished = Arc::new(AtomicUsize::new(0));

    let f = finished.clone();
    pool.enqueue(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        f.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();
    // let the worker launch it before shutting down
    tokio::time::sleep(Duration::from_millis(20)).await;

    pool.shutdown().await;
    assert_eq!(finished.load(Ordering::SeqCst), 1);

    let err = pool.enqueue(async {}).unwrap_err();
    assert_eq!(err, EnqueueError::ShutDown);
}
