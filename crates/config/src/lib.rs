// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! familiar-config: layered configuration for the dispatcher.
//!
//! Two documents exist: the process-level server config (YAML file given
//! to `familiar serve`, with `${NAME}` environment expansion) and an
//! optional per-repository override fetched from `.familiar/config.yaml`
//! on the repo's default branch. [`MergedConfig`] combines the two per
//! event; nothing is cached across events.

mod expand;
mod repo;
mod server;

pub use expand::expand_env;
pub use repo::{MergedConfig, RepoConfig, RepoPermissions, RepoPrompts};
pub use server::{
    AgentsSection, EventToggles, GitHubProviderConfig, GitLabProviderConfig, LlmSection,
    LoggingSection, Permissions, PermissionPolicy, Prompts, ProvidersSection, ServerConfig,
    ServerSection, REPO_CONFIG_PATH,
};

use std::path::Path;
use thiserror::Error;

/// Configuration loading and parsing failures. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Load the server config from a YAML file.
///
/// `${NAME}` references are substituted from the process environment
/// before parsing; missing variables substitute to empty string.
pub fn load_server_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let expanded = expand_env(&raw);
    Ok(serde_yaml::from_str(&expanded)?)
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
