// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content-addressed bare-clone store with worktree allocation.
//!
//! Layout on disk:
//!
//! ```text
//! <base>/<owner>/<name>.git                      bare clone
//! <base>/<owner>/<name>.git/worktrees-data/<id>  detached worktree
//! ```
//!
//! The cache owns the bare clones; each agent session owns one worktree
//! directory until it stops. Mutations are serialized globally by one
//! mutex to keep git invocations from interleaving. Coarse, but cache
//! mutations are rare next to agent runtimes.

use familiar_adapters::subprocess::{
    self, SubprocessError, GIT_NETWORK_TIMEOUT, GIT_WORKTREE_TIMEOUT,
};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("git clone failed: {0}")]
    Clone(String),
    #[error("git fetch failed: {0}")]
    Fetch(String),
    #[error("git worktree add failed: {0}")]
    Add(String),
    #[error("git worktree remove failed: {0}")]
    Remove(String),
    #[error("cache io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Subprocess(#[from] SubprocessError),
}

pub struct RepoCache {
    base: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl RepoCache {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into(), lock: tokio::sync::Mutex::new(()) }
    }

    pub fn repo_path(&self, owner: &str, name: &str) -> PathBuf {
        self.base.join(owner).join(format!("{}.git", name))
    }

    pub fn worktree_path(&self, owner: &str, name: &str, worktree_id: &str) -> PathBuf {
        self.repo_path(owner, name).join("worktrees-data").join(worktree_id)
    }

    /// Clone the repo bare if absent, otherwise fetch all branches.
    pub async fn ensure_repo(
        &self,
        clone_url: &str,
        owner: &str,
        name: &str,
    ) -> Result<PathBuf, CacheError> {
        let _guard = self.lock.lock().await;
        let repo = self.repo_path(owner, name);
        if repo.join("HEAD").exists() {
            let output = run_git(
                &[
                    "-C",
                    &repo.display().to_string(),
                    "fetch",
                    "--prune",
                    "origin",
                    "+refs/heads/*:refs/heads/*",
                ],
                GIT_NETWORK_TIMEOUT,
                "git fetch",
            )
            .await?;
            if !output.status.success() {
                return Err(CacheError::Fetch(stderr_of(&output)));
            }
        } else {
            if let Some(parent) = repo.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| CacheError::Io { path: parent.to_path_buf(), source })?;
            }
            let output = run_git(
                &["clone", "--bare", clone_url, &repo.display().to_string()],
                GIT_NETWORK_TIMEOUT,
                "git clone",
            )
            .await?;
            if !output.status.success() {
                return Err(CacheError::Clone(stderr_of(&output)));
            }
        }
        Ok(repo)
    }

    /// Add a detached worktree at `reference` under the repo's
    /// worktrees-data directory.
    pub async fn create_worktree(
        &self,
        owner: &str,
        name: &str,
        reference: &str,
        worktree_id: &str,
    ) -> Result<PathBuf, CacheError> {
        let _guard = self.lock.lock().await;
        let repo = self.repo_path(owner, name);
        let path = self.worktree_path(owner, name, worktree_id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| CacheError::Io { path: parent.to_path_buf(), source })?;
        }
        let output = run_git(
            &[
                "-C",
                &repo.display().to_string(),
                "worktree",
                "add",
                "--detach",
                &path.display().to_string(),
                reference,
            ],
            GIT_WORKTREE_TIMEOUT,
            "git worktree add",
        )
        .await?;
        if !output.status.success() {
            return Err(CacheError::Add(stderr_of(&output)));
        }
        Ok(path)
    }

    /// Force-remove a worktree.
    pub async fn remove_worktree(
        &self,
        owner: &str,
        name: &str,
        worktree_id: &str,
    ) -> Result<(), CacheError> {
        let _guard = self.lock.lock().await;
        let repo = self.repo_path(owner, name);
        let path = self.worktree_path(owner, name, worktree_id);
        let output = run_git(
            &[
                "-C",
                &repo.display().to_string(),
                "worktree",
                "remove",
                "--force",
                &path.display().to_string(),
            ],
            GIT_WORKTREE_TIMEOUT,
            "git worktree remove",
        )
        .await?;
        if !output.status.success() {
            return Err(CacheError::Remove(stderr_of(&output)));
        }
        Ok(())
    }
}

async fn run_git(
    args: &[&str],
    timeout: Duration,
    label: &str,
) -> Result<std::process::Output, SubprocessError> {
    let mut cmd = Command::new("git");
    cmd.args(args).env_remove("GIT_DIR").env_remove("GIT_WORK_TREE");
    subprocess::run_with_timeout(cmd, timeout, label).await
}

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
