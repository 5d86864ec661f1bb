// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrates one accepted event into one running agent.
//!
//! Steps: synthesize an agent id, resolve an authenticated clone URL,
//! materialize a worktree at the source branch, pick the container
//! working directory from the MR's changed files, build the prompt, and
//! enqueue the spawn. The spawn task owns the rest of the agent's life:
//! wait for the container, capture logs, release the worktree.

use crate::cache::{CacheError, RepoCache};
use crate::logs::LogWriter;
use crate::pool::{EnqueueError, SpawnPool};
use crate::prompt::build_prompt;
use crate::router::EventHandler;
use crate::spawner::{AgentSpawner, SpawnRequest, StopError};
use async_trait::async_trait;
use familiar_adapters::provider::ProviderSet;
use familiar_config::{AgentsSection, MergedConfig};
use familiar_core::{AgentId, Clock, Event, Metrics, ParsedIntent};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandleError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Enqueue(#[from] EnqueueError),
}

pub struct AgentHandler<C: Clock + 'static> {
    providers: Arc<ProviderSet>,
    cache: Arc<RepoCache>,
    pool: Arc<SpawnPool>,
    spawner: Arc<AgentSpawner<C>>,
    logs: Arc<LogWriter>,
    agents_cfg: AgentsSection,
    metrics: Arc<Metrics>,
}

impl<C: Clock + 'static> AgentHandler<C> {
    pub fn new(
        providers: Arc<ProviderSet>,
        cache: Arc<RepoCache>,
        pool: Arc<SpawnPool>,
        spawner: Arc<AgentSpawner<C>>,
        logs: Arc<LogWriter>,
        agents_cfg: AgentsSection,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { providers, cache, pool, spawner, logs, agents_cfg, metrics }
    }

    /// `{forge}-{repo}-{mr}-{timestamp}`: unique per event, safe in
    /// file names and container names.
    fn agent_id(event: &Event) -> AgentId {
        AgentId::new(format!(
            "{}-{}-{}-{}",
            event.forge,
            event.repo_name,
            event.mr_number,
            event.received_at.timestamp_millis()
        ))
    }

    fn clone_url(&self, event: &Event) -> String {
        match self.providers.get(event.forge) {
            Some(provider) => match provider.authenticated_clone_url(&event.clone_url) {
                Ok(url) => url,
                Err(err) => {
                    tracing::warn!(error = %err, "falling back to raw clone url");
                    event.clone_url.clone()
                }
            },
            None => event.clone_url.clone(),
        }
    }

    /// `/workspace/<LCA of changed-file directories>`, or `/workspace`
    /// when the listing is unavailable or the paths share no prefix.
    async fn working_dir(&self, event: &Event) -> String {
        let Some(provider) = self.providers.get(event.forge) else {
            return "/workspace".to_string();
        };
        match provider
            .get_changed_files(&event.repo_owner, &event.repo_name, event.mr_number)
            .await
        {
            Ok(files) => {
                let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
                match least_common_ancestor(&paths).as_str() {
                    "." => "/workspace".to_string(),
                    lca => format!("/workspace/{}", lca),
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "changed-file listing unavailable, using /workspace");
                "/workspace".to_string()
            }
        }
    }
}

#[async_trait]
impl<C: Clock + 'static> EventHandler for AgentHandler<C> {
    async fn handle(
        &self,
        event: &Event,
        config: &MergedConfig,
        intent: Option<&ParsedIntent>,
    ) -> Result<(), HandleError> {
        let agent_id = Self::agent_id(event);
        let owner = event.repo_owner.clone();
        let name = event.repo_name.clone();

        let clone_url = self.clone_url(event);
        let repo_path = self.cache.ensure_repo(&clone_url, &owner, &name).await?;
        let worktree_id = agent_id.to_string();
        // GitHub comment deliveries carry no branch; HEAD of the bare
        // clone is the repo's default branch.
        let reference = if event.source_branch.is_empty() { "HEAD" } else { &event.source_branch };
        let worktree_path =
            self.cache.create_worktree(&owner, &name, reference, &worktree_id).await?;

        let working_dir = self.working_dir(event).await;
        let prompt = build_prompt(event, config, intent);

        let mut env: HashMap<String, String> = self
            .providers
            .get(event.forge)
            .map(|p| p.agent_env())
            .unwrap_or_default();
        env.insert("FAMILIAR_AGENT_ID".to_string(), agent_id.to_string());

        let request = SpawnRequest {
            agent_id: agent_id.clone(),
            image: config.agent_image.clone(),
            prompt,
            worktree_path,
            repo_path,
            working_dir,
            env,
            network: self.agents_cfg.network.clone(),
            credentials_dir: self.agents_cfg.credentials_dir.clone(),
        };

        let spawner = Arc::clone(&self.spawner);
        let cache = Arc::clone(&self.cache);
        let logs = Arc::clone(&self.logs);
        let metrics = Arc::clone(&self.metrics);
        let log_path = logs.agent_log_path(event, &agent_id);
        let cleanup = (owner.clone(), name.clone(), worktree_id.clone());

        let enqueued = self.pool.enqueue(async move {
            if let Err(err) = spawner.spawn(request).await {
                tracing::error!(agent_id = %agent_id, error = %err, "agent spawn failed");
                metrics.agent_failed();
                if let Err(err) = cache.remove_worktree(&owner, &name, &worktree_id).await {
                    tracing::warn!(error = %err, "failed to remove worktree after spawn failure");
                }
                return;
            }

            let exit = match spawner.wait(&agent_id).await {
                Ok(code) => Some(code),
                Err(StopError::UnknownAgent(_)) => None,
                Err(err) => {
                    tracing::warn!(agent_id = %agent_id, error = %err, "wait on agent container failed");
                    None
                }
            };

            match spawner.capture_and_stop(&agent_id, &log_path, &logs).await {
                Ok(outcome) => match (outcome.timed_out, exit) {
                    (true, _) => {}
                    (false, Some(0)) => metrics.agent_completed(),
                    (false, _) => metrics.agent_failed(),
                },
                Err(StopError::UnknownAgent(_)) => {
                    // another path reaped the session; nothing left here
                }
                Err(err) => {
                    tracing::warn!(agent_id = %agent_id, error = %err, "agent teardown failed");
                    metrics.agent_failed();
                }
            }

            if let Err(err) = cache.remove_worktree(&owner, &name, &worktree_id).await {
                tracing::warn!(error = %err, "failed to remove agent worktree");
            }
        });

        if let Err(err) = enqueued {
            // the worktree must not leak when admission fails
            let (owner, name, worktree_id) = cleanup;
            if let Err(cleanup_err) = self.cache.remove_worktree(&owner, &name, &worktree_id).await
            {
                tracing::warn!(error = %cleanup_err, "failed to remove worktree after enqueue rejection");
            }
            return Err(err.into());
        }
        Ok(())
    }
}

/// Longest run of leading path components shared by the directory of
/// every path; `.` when any path sits at the repo root or the first
/// components diverge.
pub fn least_common_ancestor(paths: &[&str]) -> String {
    let mut prefix: Option<Vec<&str>> = None;
    for path in paths {
        let mut components: Vec<&str> = path.split('/').collect();
        if components.len() <= 1 {
            return ".".to_string();
        }
        components.pop(); // keep the directory only
        prefix = Some(match prefix.take() {
            None => components,
            Some(current) => current
                .iter()
                .zip(components.iter())
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| *a)
                .collect(),
        });
        if prefix.as_ref().is_some_and(Vec::is_empty) {
            return ".".to_string();
        }
    }
    match prefix {
        Some(components) if !components.is_empty() => components.join("/"),
        _ => ".".to_string(),
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
