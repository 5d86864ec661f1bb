// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-event-key suppression window.
//!
//! Bursts of events carrying the same identity key (forge/owner/name/
//! kind/mr) collapse into one accepted event per window. Comment ids are
//! excluded from the key on purpose, so rapid-fire comments on one MR
//! produce one agent.

use familiar_core::{Clock, Event};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub struct Debouncer<C: Clock> {
    window: Duration,
    clock: C,
    seen: Mutex<HashMap<String, Instant>>,
}

impl<C: Clock> Debouncer<C> {
    pub fn new(window: Duration, clock: C) -> Self {
        Self { window, clock, seen: Mutex::new(HashMap::new()) }
    }

    /// Returns true when the event should proceed. A suppressed event
    /// does not refresh its key's timestamp, so a steady trickle still
    /// gets through once per window.
    pub fn should_process(&self, event: &Event) -> bool {
        let key = event.dedupe_key();
        let now = self.clock.now();
        let mut seen = self.seen.lock();
        if let Some(&last) = seen.get(&key) {
            if now.duration_since(last) < self.window {
                return false;
            }
        }
        seen.insert(key, now);
        true
    }

    /// Drop entries older than twice the window. Precision does not
    /// matter; the map just must not grow without bound.
    pub fn sweep(&self) {
        let now = self.clock.now();
        let horizon = self.window * 2;
        self.seen.lock().retain(|_, last| now.duration_since(*last) < horizon);
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.seen.lock().len()
    }
}

impl<C: Clock + 'static> Debouncer<C> {
    /// Periodic sweep task; stops when the token is cancelled.
    pub fn spawn_sweeper(self: Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let debouncer = self;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(SWEEP_INTERVAL);
            tick.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tick.tick() => debouncer.sweep(),
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "debounce_tests.rs"]
mod tests;
