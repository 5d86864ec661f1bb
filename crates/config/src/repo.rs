// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-repository override document and the merge resolver.
//!
//! Repos may commit `.familiar/config.yaml` to their default branch to
//! override prompts and permissions, opt in to event kinds, or pin an
//! agent image. The merged view is resolved lazily per event and never
//! cached.

use crate::server::{EventToggles, Permissions, PermissionPolicy, Prompts, ServerConfig};
use crate::ConfigError;
use familiar_core::EventKind;
use serde::{Deserialize, Serialize};

/// Repository override document. Every field is optional; an absent
/// field defers to the process default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoConfig {
    #[serde(default)]
    pub events: Option<EventToggles>,
    #[serde(default)]
    pub permissions: Option<RepoPermissions>,
    #[serde(default)]
    pub prompts: Option<RepoPrompts>,
    #[serde(default)]
    pub agent_image: Option<String>,
}

/// Optional per-capability overrides.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RepoPermissions {
    #[serde(default)]
    pub merge: Option<PermissionPolicy>,
    #[serde(default)]
    pub approve: Option<PermissionPolicy>,
    #[serde(default)]
    pub push_commits: Option<PermissionPolicy>,
    #[serde(default)]
    pub dismiss_reviews: Option<PermissionPolicy>,
}

/// Optional per-kind prompt overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoPrompts {
    #[serde(default)]
    pub mr_opened: Option<String>,
    #[serde(default)]
    pub mr_comment: Option<String>,
    #[serde(default)]
    pub mr_updated: Option<String>,
    #[serde(default)]
    pub mention: Option<String>,
}

impl RepoConfig {
    /// Parse the override document fetched from the repo.
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }
}

/// The per-event view combining process defaults with repo overrides.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub events: EventToggles,
    pub permissions: Permissions,
    pub prompts: Prompts,
    pub agent_image: String,
}

impl MergedConfig {
    /// Merge rule: the non-empty repo value wins for scalars; enablement
    /// is the logical OR of the two toggle sets.
    pub fn resolve(server: &ServerConfig, repo: &RepoConfig) -> Self {
        let events = match repo.events {
            Some(overrides) => server.events.or(&overrides),
            None => server.events,
        };

        let mut permissions = server.permissions;
        if let Some(p) = repo.permissions {
            if let Some(v) = p.merge {
                permissions.merge = v;
            }
            if let Some(v) = p.approve {
                permissions.approve = v;
            }
            if let Some(v) = p.push_commits {
                permissions.push_commits = v;
            }
            if let Some(v) = p.dismiss_reviews {
                permissions.dismiss_reviews = v;
            }
        }

        let mut prompts = server.prompts.clone();
        if let Some(p) = &repo.prompts {
            for (kind, value) in [
                (EventKind::MrOpened, &p.mr_opened),
                (EventKind::MrComment, &p.mr_comment),
                (EventKind::MrUpdated, &p.mr_updated),
                (EventKind::Mention, &p.mention),
            ] {
                if let Some(text) = value {
                    if !text.trim().is_empty() {
                        match kind {
                            EventKind::MrOpened => prompts.mr_opened = text.clone(),
                            EventKind::MrComment => prompts.mr_comment = text.clone(),
                            EventKind::MrUpdated => prompts.mr_updated = text.clone(),
                            EventKind::Mention => prompts.mention = text.clone(),
                        }
                    }
                }
            }
        }

        let agent_image = match &repo.agent_image {
            Some(image) if !image.trim().is_empty() => image.clone(),
            _ => server.agents.image.clone(),
        };

        Self { events, permissions, prompts, agent_image }
    }
}

#[cfg(test)]
#[path = "repo_tests.rs"]
mod tests;
