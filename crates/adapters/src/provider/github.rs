// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GitHub REST capability.

use super::{ChangedFile, ProviderError};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("familiar/", env!("CARGO_PKG_VERSION"));

pub struct GitHubProvider {
    client: reqwest::Client,
    token: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct PullFile {
    filename: String,
    status: String,
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
}

impl GitHubProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_base(token, API_BASE)
    }

    pub fn with_api_base(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { client, token: token.into(), api_base: api_base.into() }
    }

    pub async fn get_changed_files(
        &self,
        owner: &str,
        name: &str,
        mr: u64,
    ) -> Result<Vec<ChangedFile>, ProviderError> {
        let url =
            format!("{}/repos/{}/{}/pulls/{}/files?per_page=100", self.api_base, owner, name, mr);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|source| ProviderError::Http { url: url.clone(), source })?;
        if !response.status().is_success() {
            return Err(ProviderError::Status { url, status: response.status() });
        }
        let files: Vec<PullFile> = response
            .json()
            .await
            .map_err(|source| ProviderError::Decode { url: url.clone(), source })?;
        Ok(files
            .into_iter()
            .map(|f| ChangedFile {
                path: f.filename,
                status: f.status,
                additions: f.additions,
                deletions: f.deletions,
            })
            .collect())
    }

    /// Inject `x-access-token:<token>` userinfo so git can fetch over
    /// https without a credential helper.
    pub fn authenticated_clone_url(&self, raw: &str) -> Result<String, ProviderError> {
        let rest = raw
            .strip_prefix("https://")
            .ok_or_else(|| ProviderError::CloneUrl(raw.to_string()))?;
        Ok(format!("https://x-access-token:{}@{}", self.token, rest))
    }

    pub fn agent_env(&self) -> HashMap<String, String> {
        HashMap::from([("GITHUB_TOKEN".to_string(), self.token.clone())])
    }

    pub async fn fetch_file(
        &self,
        owner: &str,
        name: &str,
        path: &str,
    ) -> Result<Option<String>, ProviderError> {
        let url = format!("{}/repos/{}/{}/contents/{}", self.api_base, owner, name, path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github.raw+json")
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
