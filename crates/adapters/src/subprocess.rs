// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded child-process execution.
//!
//! Every git and docker invocation in the dispatcher goes through
//! [`run_with_timeout`] so a wedged subprocess cannot hang a handler.

use std::process::Output;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Budget for clone/fetch against a remote.
pub const GIT_NETWORK_TIMEOUT: Duration = Duration::from_secs(300);

/// Budget for local worktree add/remove.
pub const GIT_WORKTREE_TIMEOUT: Duration = Duration::from_secs(60);

/// Budget for docker CLI calls other than `stop` (which carries its own
/// grace period).
pub const DOCKER_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("{label} timed out after {timeout:?}")]
    Timeout { label: String, timeout: Duration },
    #[error("failed to run {label}: {source}")]
    Spawn {
        label: String,
        #[source]
        source: std::io::Error,
    },
}

/// Run a command to completion with a wall-clock budget.
///
/// The child is killed on timeout (kill_on_drop). A non-zero exit status
/// is not an error here; callers inspect `output.status`.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    label: &str,
) -> Result<Output, SubprocessError> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(SubprocessError::Spawn { label: label.to_string(), source }),
        Err(_) => Err(SubprocessError::Timeout { label: label.to_string(), timeout }),
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
