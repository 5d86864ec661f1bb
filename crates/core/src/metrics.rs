// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide operational counters.
//!
//! Each field is an independent atomic; a snapshot reads every field with
//! relaxed ordering, so it is consistent per field but not across fields.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Dispatcher counters, shared behind an `Arc`.
#[derive(Debug, Default)]
pub struct Metrics {
    agents_spawned: AtomicU64,
    agents_completed: AtomicU64,
    agents_failed: AtomicU64,
    agents_timed_out: AtomicU64,
    webhooks_received: AtomicU64,
    webhooks_processed: AtomicU64,
}

/// Point-in-time view of [`Metrics`], served by `GET /metrics`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub agents_spawned: u64,
    pub agents_completed: u64,
    pub agents_failed: u64,
    pub agents_timed_out: u64,
    pub webhooks_received: u64,
    pub webhooks_processed: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn agent_spawned(&self) {
        self.agents_spawned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn agent_completed(&self) {
        self.agents_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn agent_failed(&self) {
        self.agents_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn agent_timed_out(&self) {
        self.agents_timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn webhook_received(&self) {
        self.webhooks_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn webhook_processed(&self) {
        self.webhooks_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            agents_spawned: self.agents_spawned.load(Ordering::Relaxed),
            agents_completed: self.agents_completed.load(Ordering::Relaxed),
            agents_failed: self.agents_failed.load(Ordering::Relaxed),
            agents_timed_out: self.agents_timed_out.load(Ordering::Relaxed),
            webhooks_received: self.webhooks_received.load(Ordering::Relaxed),
            webhooks_processed: self.webhooks_processed.load(Ordering::Relaxed),
        }
    }

    /// Zero every counter. Intended for tests.
    pub fn reset(&self) {
        self.agents_spawned.store(0, Ordering::Relaxed);
        self.agents_completed.store(0, Ordering::Relaxed);
        self.agents_failed.store(0, Ordering::Relaxed);
        self.agents_timed_out.store(0, Ordering::Relaxed);
        self.webhooks_received.store(0, Ordering::Relaxed);
        self.webhooks_processed.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
