// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent log files and retention.
//!
//! One file per agent under `<base>/<owner>/<name>/<mr>/`, named with a
//! filesystem-safe timestamp, the event kind, and the agent id. The
//! cleaner deletes files older than the retention window and prunes the
//! directories that empty out.

use familiar_core::{AgentId, Event};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

pub struct LogWriter {
    base: PathBuf,
}

impl LogWriter {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// `<base>/<owner>/<name>/<mr>/<timestamp>-<kind>-<agentid>.log`
    pub fn agent_log_path(&self, event: &Event, agent_id: &AgentId) -> PathBuf {
        let file = format!(
            "{}-{}-{}.log",
            event.received_at.format(TIMESTAMP_FORMAT),
            event.kind,
            agent_id
        );
        self.base
            .join(&event.repo_owner)
            .join(&event.repo_name)
            .join(event.mr_number.to_string())
            .join(file)
    }

    /// Append bytes, creating the file (mode 0644) and its parents on
    /// first use.
    pub fn append(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }
        let mut file = options.open(path)?;
        file.write_all(bytes)
    }
}

pub struct LogCleaner {
    base: PathBuf,
    retention: Duration,
}

impl LogCleaner {
    pub fn new(base: impl Into<PathBuf>, retention_days: u32) -> Self {
        Self { base: base.into(), retention: Duration::from_secs(u64::from(retention_days) * 86_400) }
    }

    /// Delete files past retention, then prune empty directories.
    pub fn clean(&self) -> std::io::Result<()> {
        let cutoff = SystemTime::now()
            .checked_sub(self.retention)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        self.clean_older_than(cutoff)
    }

    pub(crate) fn clean_older_than(&self, cutoff: SystemTime) -> std::io::Result<()> {
        if !self.base.exists() {
            return Ok(());
        }
        remove_old_files(&self.base, cutoff)?;
        // Repeated passes until no empty directory remains; each pass
        // can expose a newly-empty parent.
        loop {
            let removed = remove_empty_dirs(&self.base)?;
            if removed == 0 {
                break;
            }
        }
        Ok(())
    }
}

fn remove_old_files(dir: &Path, cutoff: SystemTime) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            remove_old_files(&path, cutoff)?;
        } else if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
            if modified < cutoff {
                if let Err(err) = fs::remove_file(&path) {
                    tracing::warn!(path = %path.display(), error = %err, "failed to delete expired log");
                }
            }
        }
    }
    Ok(())
}

/// Remove directories under (not including) `base` that are empty.
/// Returns how many were removed this pass.
fn remove_empty_dirs(base: &Path) -> std::io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(base)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        removed += remove_empty_dirs(&path)?;
        if fs::read_dir(&path)?.next().is_none() {
            fs::remove_dir(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Run the cleaner immediately, then on a fixed tick until cancelled.
pub fn spawn_cleanup_scheduler(
    cleaner: Arc<LogCleaner>,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tick.tick() => {
                    if let Err(err) = cleaner.clean() {
                        tracing::warn!(error = %err, "log cleanup pass failed");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "logs_tests.rs"]
mod tests;
