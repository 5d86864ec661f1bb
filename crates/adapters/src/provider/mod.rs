// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Forge provider capability.
//!
//! GitHub and GitLab are tagged variants behind one enum; adding a
//! dialect means adding a variant and filling in the capability table.
//! Callers hold `Option<Provider>` — a dialect without configured
//! credentials has no provider and its events cannot be handled.

pub mod github;
pub mod gitlab;

pub use github::GitHubProvider;
pub use gitlab::GitLabProvider;

use crate::retry::Retryable;
use familiar_core::Forge;
use std::collections::HashMap;
use thiserror::Error;

/// One entry of a merge request's changed-file listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub path: String,
    /// Forge-reported status: added, modified, removed, renamed.
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}")]
    Status { url: String, status: reqwest::StatusCode },
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("cannot authenticate clone url {0:?}")]
    CloneUrl(String),
}

impl Retryable for ProviderError {
    fn is_transient(&self) -> bool {
        match self {
            ProviderError::Http { source, .. } => source.is_timeout() || source.is_connect(),
            ProviderError::Status { status, .. } => status.is_server_error(),
            ProviderError::Decode { .. } | ProviderError::CloneUrl(_) => false,
        }
    }
}

/// A configured forge dialect. Dispatch is a match on the variant.
pub enum Provider {
    GitHub(GitHubProvider),
    GitLab(GitLabProvider),
}

impl Provider {
    /// Dialect tag used for routing.
    pub fn name(&self) -> Forge {
        match self {
            Provider::GitHub(_) => Forge::GitHub,
            Provider::GitLab(_) => Forge::GitLab,
        }
    }

    /// Changed files of a merge request, for working-directory
    /// resolution.
    pub async fn get_changed_files(
        &self,
        owner: &str,
        name: &str,
        mr: u64,
    ) -> Result<Vec<ChangedFile>, ProviderError> {
        match self {
            Provider::GitHub(p) => p.get_changed_files(owner, name, mr).await,
            Provider::GitLab(p) => p.get_changed_files(owner, name, mr).await,
        }
    }

    /// A clone URL the cache can fetch with.
    ///
    /// GitHub injects token userinfo; GitLab leaves the raw URL alone
    /// (its token reaches the agent via the environment instead).
    pub fn authenticated_clone_url(&self, raw: &str) -> Result<String, ProviderError> {
        match self {
            Provider::GitHub(p) => p.authenticated_clone_url(raw),
            Provider::GitLab(p) => Ok(p.authenticated_clone_url(raw)),
        }
    }

    /// Credentials injected into the agent container environment.
    pub fn agent_env(&self) -> HashMap<String, String> {
        match self {
            Provider::GitHub(p) => p.agent_env(),
            Provider::GitLab(p) => p.agent_env(),
        }
    }

    /// Fetch a file from the repo's default branch. `Ok(None)` means the
    /// file does not exist; anything else that goes wrong propagates.
    pub async fn fetch_file(
        &self,
        owner: &str,
        name: &str,
        path: &str,
    ) -> Result<Option<String>, ProviderError> {
        match self {
            Provider::GitHub(p) => p.fetch_file(owner, name, path).await,
            Provider::GitLab(p) => p.fetch_file(owner, name, path).await,
        }
    }
}

/// The providers configured for this process, at most one per dialect.
#[derive(Default)]
pub struct ProviderSet {
    github: Option<Provider>,
    gitlab: Option<Provider>,
}

impl ProviderSet {
    pub fn new(github: Option<GitHubProvider>, gitlab: Option<GitLabProvider>) -> Self {
        Self {
            github: github.map(Provider::GitHub),
            gitlab: gitlab.map(Provider::GitLab),
        }
    }

    pub fn from_config(cfg: &familiar_config::ProvidersSection) -> Self {
        Self::new(
            cfg.github.as_ref().map(|gh| GitHubProvider::new(gh.token.clone())),
            cfg.gitlab
                .as_ref()
                .map(|gl| GitLabProvider::new(gl.token.clone(), gl.base_url.clone())),
        )
    }

    pub fn get(&self, forge: Forge) -> Option<&Provider> {
        match forge {
            Forge::GitHub => self.github.as_ref(),
            Forge::GitLab => self.gitlab.as_ref(),
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
