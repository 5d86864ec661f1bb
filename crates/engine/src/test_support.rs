// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fakes for engine unit tests.

use async_trait::async_trait;
use familiar_adapters::docker::{ContainerRuntime, ContainerSpec, RuntimeError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Container runtime that records calls instead of touching docker.
///
/// `wait` blocks until `release_wait` is notified (or returns
/// immediately once `finish_immediately` is set), so tests can hold an
/// "agent" open while they assert on intermediate state.
#[derive(Default)]
pub struct FakeRuntime {
    pub fail_start: AtomicBool,
    pub finish_immediately: AtomicBool,
    pub created: Mutex<Vec<(String, ContainerSpec)>>,
    pub started: Mutex<Vec<String>>,
    pub stopped: Mutex<Vec<String>>,
    pub removed: Mutex<Vec<String>>,
    pub release_wait: Notify,
    next_id: AtomicUsize,
}

impl FakeRuntime {
    pub fn finishing() -> Self {
        let runtime = Self::default();
        runtime.finish_immediately.store(true, Ordering::SeqCst);
        runtime
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn create(&self, name: &str, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let id = format!("ctr-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.created.lock().push((name.to_string(), spec.clone()));
        Ok(id)
    }

    async fn start(&self, id: &str) -> Result<(), RuntimeError> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(RuntimeError::CommandFailed { op: "start", message: "boom".into() });
        }
        self.started.lock().push(id.to_string());
        Ok(())
    }

    async fn stop(&self, id: &str, _grace: Duration) -> Result<(), RuntimeError> {
        self.stopped.lock().push(id.to_string());
        self.release_wait.notify_waiters();
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), RuntimeError> {
        self.removed.lock().push(id.to_string());
        Ok(())
    }

    async fn wait(&self, _id: &str) -> Result<i64, RuntimeError> {
        if self.finish_immediately.load(Ordering::SeqCst) {
            return Ok(0);
        }
        self.release_wait.notified().await;
        Ok(0)
    }

    async fn logs(&self, _id: &str) -> Result<Vec<u8>, RuntimeError> {
        Ok(b"agent output\n".to_vec())
    }

    async fn ping(&self) -> bool {
        true
    }
}
