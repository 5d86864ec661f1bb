// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event filtering and dispatch.
//!
//! The pipeline runs in a fixed order, each stage able to short-circuit:
//! process-level enablement, bot-author suppression, debounce, repo
//! config merge, intent parse (comment kinds only), dispatch.

use crate::debounce::Debouncer;
use crate::handler::HandleError;
use async_trait::async_trait;
use familiar_adapters::intent::IntentParser;
use familiar_adapters::provider::{ProviderError, ProviderSet};
use familiar_adapters::retry::{with_retry, RetryConfig, RetryError};
use familiar_config::{ConfigError, MergedConfig, RepoConfig, ServerConfig, REPO_CONFIG_PATH};
use familiar_core::{Clock, Event, ParsedIntent};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// GitLab project access tokens comment under generated accounts that
/// match this shape.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static PROJECT_BOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^project_\d+_bot_[0-9a-f]+$").expect("constant regex pattern is valid")
});

/// Where the pipeline ended for an accepted webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Dispatched,
    DroppedDisabled,
    DroppedBotAuthor,
    DroppedDebounced,
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("failed to fetch repo config: {0}")]
    RepoConfigFetch(#[from] ProviderError),
    #[error("failed to parse repo config: {0}")]
    RepoConfigParse(#[from] ConfigError),
    #[error("dispatcher is shutting down")]
    ShuttingDown,
    #[error(transparent)]
    Handler(#[from] HandleError),
}

/// The dispatch target at the end of the pipeline.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(
        &self,
        event: &Event,
        config: &MergedConfig,
        intent: Option<&ParsedIntent>,
    ) -> Result<(), HandleError>;
}

pub struct Router<C: Clock> {
    config: Arc<ServerConfig>,
    providers: Arc<ProviderSet>,
    debouncer: Arc<Debouncer<C>>,
    parser: Option<Arc<dyn IntentParser>>,
    handler: Arc<dyn EventHandler>,
    cancel: CancellationToken,
}

impl<C: Clock> Router<C> {
    pub fn new(
        config: Arc<ServerConfig>,
        providers: Arc<ProviderSet>,
        debouncer: Arc<Debouncer<C>>,
        parser: Option<Arc<dyn IntentParser>>,
        handler: Arc<dyn EventHandler>,
        cancel: CancellationToken,
    ) -> Self {
        Self { config, providers, debouncer, parser, handler, cancel }
    }

    pub async fn route(&self, event: &Event) -> Result<RouteOutcome, RouteError> {
        if !self.config.events.enabled(event.kind) {
            return Ok(RouteOutcome::DroppedDisabled);
        }

        if is_bot_author(&event.actor, &self.config.agents.bot_username) {
            tracing::debug!(actor = %event.actor, "dropping event from bot author");
            return Ok(RouteOutcome::DroppedBotAuthor);
        }

        if !self.debouncer.should_process(event) {
            tracing::debug!(key = %event.dedupe_key(), "debounced duplicate event");
            return Ok(RouteOutcome::DroppedDebounced);
        }

        let repo_config = self.fetch_repo_config(event).await?;
        let merged = MergedConfig::resolve(&self.config, &repo_config);

        let intent = match (&self.parser, event.kind.has_comment()) {
            (Some(parser), true) => {
                let body = event.comment_body().unwrap_or_default();
                match parser.parse(body).await {
                    Ok(intent) => Some(intent),
                    Err(err) => {
                        // a broken classifier must not block dispatch
                        tracing::warn!(error = %err, "intent parse failed, continuing without intent");
                        None
                    }
                }
            }
            _ => None,
        };

        self.handler.handle(event, &merged, intent.as_ref()).await?;
        Ok(RouteOutcome::Dispatched)
    }

    /// `.familiar/config.yaml` from the repo's default branch; absent
    /// file (or unconfigured dialect) means an empty override document.
    /// Transient fetch failures are retried with backoff.
    async fn fetch_repo_config(&self, event: &Event) -> Result<RepoConfig, RouteError> {
        let Some(provider) = self.providers.get(event.forge) else {
            return Ok(RepoConfig::default());
        };
        let fetched = with_retry(&self.cancel, &RetryConfig::default(), || {
            provider.fetch_file(&event.repo_owner, &event.repo_name, REPO_CONFIG_PATH)
        })
        .await;
        match fetched {
            Ok(Some(raw)) => Ok(RepoConfig::from_yaml(&raw)?),
            Ok(None) => Ok(RepoConfig::default()),
            Err(RetryError::Cancelled) => Err(RouteError::ShuttingDown),
            Err(RetryError::Inner(err)) => Err(err.into()),
        }
    }
}

/// True for this system's own reply identities: the configured username
/// (case-insensitive), `*[bot]` service accounts, and GitLab project
/// access token accounts.
pub fn is_bot_author(author: &str, configured_bot: &str) -> bool {
    author.eq_ignore_ascii_case(configured_bot)
        || author.ends_with("[bot]")
        || PROJECT_BOT.is_match(author)
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
