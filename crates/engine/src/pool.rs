// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded admission for agent spawns.
//!
//! Two separate bounds, deliberately not merged: a FIFO queue with
//! non-blocking enqueue (reports full), and a parallelism semaphore the
//! worker acquires before dequeuing. Folding them together would let a
//! slow spawn backpressure enqueues.

use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnqueueError {
    #[error("spawn queue is full")]
    QueueFull,
    #[error("spawn pool is shut down")]
    ShutDown,
}

pub struct SpawnPool {
    tx: mpsc::Sender<Job>,
    cancel: CancellationToken,
    tracker: TaskTracker,
    worker: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl SpawnPool {
    pub fn new(max_concurrent: usize, queue_size: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<Job>(queue_size.max(1));
        let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();

        let worker_cancel = cancel.clone();
        let worker_tracker = tracker.clone();
        let worker = tokio::spawn(async move {
            loop {
                // A permit is held before dequeuing so queued items stay
                // in the channel and enqueue sees the true queue depth.
                let permit = tokio::select! {
                    _ = worker_cancel.cancelled() => break,
                    permit = semaphore.clone().acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                };
                let job = tokio::select! {
                    _ = worker_cancel.cancelled() => break,
                    job = rx.recv() => match job {
                        Some(job) => job,
                        None => break,
                    },
                };
                worker_tracker.spawn(async move {
                    job.await;
                    drop(permit);
                });
            }
        });

        Self { tx, cancel, tracker, worker: Mutex::new(Some(worker)) }
    }

    /// Non-blocking admission. A full queue is reported immediately so
    /// the webhook sender can redeliver later.
    pub fn enqueue<F>(&self, job: F) -> Result<(), EnqueueError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            return Err(EnqueueError::ShutDown);
        }
        self.tx.try_send(Box::pin(job)).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => EnqueueError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => EnqueueError::ShutDown,
        })
    }

    /// Cancel the worker and wait for every task launched before the
    /// cancellation. Running containers are not touched here; that is
    /// the spawner's StopAll.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }
        self.tracker.close();
        self.tracker.wait().await;
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
