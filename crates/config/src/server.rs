// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-level server configuration schema.

use familiar_core::EventKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Path of the per-repository override document on the default branch.
pub const REPO_CONFIG_PATH: &str = ".familiar/config.yaml";

/// Top-level server configuration, parsed from the `--config` YAML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub providers: ProvidersSection,
    #[serde(default)]
    pub events: EventToggles,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub prompts: Prompts,
    #[serde(default)]
    pub agents: AgentsSection,
    #[serde(default)]
    pub llm: LlmSection,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    7000
}

/// Per-agent log storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self { dir: default_log_dir(), retention_days: default_retention_days() }
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/log/familiar")
}

fn default_retention_days() -> u32 {
    30
}

/// Forge provider credentials. A missing section means the dialect is
/// not configured and its webhook endpoint rejects all deliveries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersSection {
    #[serde(default)]
    pub github: Option<GitHubProviderConfig>,
    #[serde(default)]
    pub gitlab: Option<GitLabProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubProviderConfig {
    #[serde(default = "default_auth_method")]
    pub auth_method: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub webhook_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabProviderConfig {
    #[serde(default = "default_auth_method")]
    pub auth_method: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub webhook_secret: String,
    #[serde(default = "default_gitlab_base_url")]
    pub base_url: String,
}

fn default_auth_method() -> String {
    "token".to_string()
}

fn default_gitlab_base_url() -> String {
    "https://gitlab.com".to_string()
}

/// Per-event-kind enablement flags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EventToggles {
    #[serde(default = "default_true")]
    pub mr_opened: bool,
    #[serde(default = "default_true")]
    pub mr_comment: bool,
    #[serde(default)]
    pub mr_updated: bool,
    #[serde(default = "default_true")]
    pub mention: bool,
}

impl Default for EventToggles {
    fn default() -> Self {
        Self { mr_opened: true, mr_comment: true, mr_updated: false, mention: true }
    }
}

impl EventToggles {
    pub fn enabled(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::MrOpened => self.mr_opened,
            EventKind::MrComment => self.mr_comment,
            EventKind::MrUpdated => self.mr_updated,
            EventKind::Mention => self.mention,
        }
    }

    /// Combine with a repo override: a repo may opt in to kinds the
    /// process default leaves off.
    pub fn or(&self, other: &EventToggles) -> EventToggles {
        EventToggles {
            mr_opened: self.mr_opened || other.mr_opened,
            mr_comment: self.mr_comment || other.mr_comment,
            mr_updated: self.mr_updated || other.mr_updated,
            mention: self.mention || other.mention,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Policy for one privileged agent capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionPolicy {
    Always,
    OnRequest,
    Never,
}

/// Permission policy per privileged capability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default = "default_never")]
    pub merge: PermissionPolicy,
    #[serde(default = "default_never")]
    pub approve: PermissionPolicy,
    #[serde(default = "default_on_request")]
    pub push_commits: PermissionPolicy,
    #[serde(default = "default_never")]
    pub dismiss_reviews: PermissionPolicy,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            merge: PermissionPolicy::Never,
            approve: PermissionPolicy::Never,
            push_commits: PermissionPolicy::OnRequest,
            dismiss_reviews: PermissionPolicy::Never,
        }
    }
}

fn default_never() -> PermissionPolicy {
    PermissionPolicy::Never
}

fn default_on_request() -> PermissionPolicy {
    PermissionPolicy::OnRequest
}

/// Base prompt template per event kind, with `{MR_NUMBER}`,
/// `{REPO_OWNER}`, and `{REPO_NAME}` placeholder support.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompts {
    #[serde(default = "default_prompt_opened")]
    pub mr_opened: String,
    #[serde(default = "default_prompt_comment")]
    pub mr_comment: String,
    #[serde(default = "default_prompt_updated")]
    pub mr_updated: String,
    #[serde(default = "default_prompt_mention")]
    pub mention: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            mr_opened: default_prompt_opened(),
            mr_comment: default_prompt_comment(),
            mr_updated: default_prompt_updated(),
            mention: default_prompt_mention(),
        }
    }
}

impl Prompts {
    pub fn for_kind(&self, kind: EventKind) -> &str {
        match kind {
            EventKind::MrOpened => &self.mr_opened,
            EventKind::MrComment => &self.mr_comment,
            EventKind::MrUpdated => &self.mr_updated,
            EventKind::Mention => &self.mention,
        }
    }
}

fn default_prompt_opened() -> String {
    "Review merge request #{MR_NUMBER} in {REPO_OWNER}/{REPO_NAME}. \
     Read the diff, leave review comments on problems you find, and \
     summarize the change."
        .to_string()
}

fn default_prompt_comment() -> String {
    "A reviewer commented on merge request #{MR_NUMBER} in \
     {REPO_OWNER}/{REPO_NAME}. Address the comment."
        .to_string()
}

fn default_prompt_updated() -> String {
    "Merge request #{MR_NUMBER} in {REPO_OWNER}/{REPO_NAME} received new \
     commits. Re-review the updated diff."
        .to_string()
}

fn default_prompt_mention() -> String {
    "You were mentioned on merge request #{MR_NUMBER} in \
     {REPO_OWNER}/{REPO_NAME}. Respond to the request."
        .to_string()
}

/// Agent runtime bounds and container settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsSection {
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: u64,
    #[serde(default = "default_debounce_seconds")]
    pub debounce_seconds: u64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
    #[serde(default = "default_max_agents")]
    pub max_agents: usize,
    #[serde(default = "default_image")]
    pub image: String,
    #[serde(default = "default_network")]
    pub network: String,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Host directory bind-mounted read-only at /claude-auth-src.
    #[serde(default)]
    pub credentials_dir: Option<PathBuf>,
    /// Drives both mention detection (`@<name>`) and self-loop
    /// suppression.
    #[serde(default = "default_bot_username")]
    pub bot_username: String,
}

impl Default for AgentsSection {
    fn default() -> Self {
        Self {
            timeout_minutes: default_timeout_minutes(),
            debounce_seconds: default_debounce_seconds(),
            max_concurrent: default_max_concurrent(),
            queue_size: default_queue_size(),
            max_agents: default_max_agents(),
            image: default_image(),
            network: default_network(),
            cache_dir: default_cache_dir(),
            credentials_dir: None,
            bot_username: default_bot_username(),
        }
    }
}

fn default_timeout_minutes() -> u64 {
    30
}

fn default_debounce_seconds() -> u64 {
    10
}

fn default_max_concurrent() -> usize {
    5
}

fn default_queue_size() -> usize {
    20
}

fn default_max_agents() -> usize {
    10
}

fn default_image() -> String {
    "familiar-agent:latest".to_string()
}

fn default_network() -> String {
    "bridge".to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("/var/lib/familiar/repos")
}

fn default_bot_username() -> String {
    "familiar".to_string()
}

/// Intent-classifier endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_llm_strategy")]
    pub strategy: String,
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    /// Total attempts for 5xx responses; 1 means no retries.
    #[serde(default = "default_llm_max_attempts")]
    pub max_attempts: u32,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            strategy: default_llm_strategy(),
            provider: default_llm_provider(),
            model: default_llm_model(),
            api_key: String::new(),
            base_url: default_llm_base_url(),
            max_attempts: default_llm_max_attempts(),
        }
    }
}

fn default_llm_strategy() -> String {
    "llm".to_string()
}

fn default_llm_provider() -> String {
    "anthropic".to_string()
}

fn default_llm_model() -> String {
    "claude-opus-5".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_llm_max_attempts() -> u32 {
    1
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
