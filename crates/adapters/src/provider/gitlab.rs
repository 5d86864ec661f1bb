// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GitLab REST capability.
//!
//! Also works against self-hosted instances; the base URL comes from
//! `providers.gitlab.base_url`.

use super::{ChangedFile, ProviderError};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const USER_AGENT: &str = concat!("familiar/", env!("CARGO_PKG_VERSION"));

pub struct GitLabProvider {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MrChanges {
    #[serde(default)]
    changes: Vec<MrChange>,
}

#[derive(Debug, Deserialize)]
struct MrChange {
    new_path: String,
    #[serde(default)]
    new_file: bool,
    #[serde(default)]
    deleted_file: bool,
    #[serde(default)]
    renamed_file: bool,
    #[serde(default)]
    diff: String,
}

impl GitLabProvider {
    pub fn new(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, token: token.into(), base_url }
    }

    fn project_id(owner: &str, name: &str) -> String {
        format!("{}%2F{}", owner, name)
    }

    pub async fn get_changed_files(
        &self,
        owner: &str,
        name: &str,
        mr: u64,
    ) -> Result<Vec<ChangedFile>, ProviderError> {
        let url = format!(
            "{}/api/v4/projects/{}/merge_requests/{}/changes",
            self.base_url,
            Self::project_id(owner, name),
            mr
        );
        let response = self
            .client
            .get(&url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await
            .map_err(|source| ProviderError::Http { url: url.clone(), source })?;
        if !response.status().is_success() {
            return Err(ProviderError::Status { url, status: response.status() });
        }
        let changes: MrChanges = response
            .json()
            .await
            .map_err(|source| ProviderError::Decode { url: url.clone(), source })?;
        Ok(changes.changes.into_iter().map(ChangedFile::from).collect())
    }

    /// GitLab clone URLs stay raw; the token reaches the agent through
    /// `GITLAB_TOKEN` instead of URL userinfo.
    pub fn authenticated_clone_url(&self, raw: &str) -> String {
        raw.to_string()
    }

    pub fn agent_env(&self) -> HashMap<String, String> {
        HashMap::from([
            ("GITLAB_TOKEN".to_string(), self.token.clone()),
            ("GITLAB_HOST".to_string(), self.base_url.clone()),
        ])
    }

    pub async fn fetch_file(
        &self,
        owner: &str,
        name: &str,
        path: &str,
    ) -> Result<Option<String>, ProviderError> {
        let encoded_path = path.replace('/', "%2F");
        let url = format!(
            "{}/api/v4/projects/{}/repository/files/{}/raw?ref=HEAD",
            self.base_url,
            Self::project_id(owner, name),
            encoded_path
        );
        let response = self
            .client
            .get(&url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await
            .map_err(|source| ProviderError::Http { url: url.clone(), source })?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ProviderError::Status { url, status: response.status() });
        }
        let body = response
            .text()
            .await
            .map_err(|source| ProviderError::Decode { url: url.clone(), source })?;
        Ok(Some(body))
    }
}

impl From<MrChange> for ChangedFile {
    fn from(change: MrChange) -> Self {
        let status = if change.new_file {
            "added"
        } else if change.deleted_file {
            "removed"
        } else if change.renamed_file {
            "renamed"
        } else {
            "modified"
        };
        let (additions, deletions) = count_diff_lines(&change.diff);
        ChangedFile { path: change.new_path, status: status.to_string(), additions, deletions }
    }
}

/// GitLab's changes payload carries unified diffs rather than counts.
pub(super) fn count_diff_lines(diff: &str) -> (u64, u64) {
    let mut additions = 0;
    let mut deletions = 0;
    for line in diff.lines() {
        if line.starts_with('+') && !line.starts_with("+++") {
            additions += 1;
        } else if line.starts_with('-') && !line.starts_with("---") {
            deletions += 1;
        }
    }
    (additions, deletions)
}
