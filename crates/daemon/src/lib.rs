// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! familiar-daemon: the HTTP surface and process wiring.
//!
//! Webhook deliveries come in, get verified and normalized, and flow
//! into the engine's router. Health and metrics ride on the same
//! listener. [`run`] assembles the whole dispatcher from a
//! [`ServerConfig`] and serves until SIGINT/SIGTERM.

pub mod normalize;
pub mod server;
pub mod webhook;

pub use normalize::{normalize_github, normalize_gitlab, NormalizeError};
pub use server::{serve, AppState, ServeError};

use familiar_adapters::docker::DockerCli;
use familiar_adapters::intent::{IntentParser, LlmIntentParser};
use familiar_adapters::provider::ProviderSet;
use familiar_config::ServerConfig;
use familiar_core::{Metrics, SystemClock};
use familiar_engine::{
    AgentHandler, AgentSpawner, Debouncer, LogCleaner, LogWriter, RepoCache, Router, SpawnPool,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(6 * 3600);
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the dispatcher and serve until a termination signal arrives.
///
/// Shutdown order: stop accepting connections and drain in-flight
/// requests, stop admitting spawns and wait for launched agents' tasks,
/// stop every live container, then stop the background sweeps.
pub async fn run(config: ServerConfig) -> Result<(), ServeError> {
    let config = Arc::new(config);
    let cancel = CancellationToken::new();

    let metrics = Arc::new(Metrics::new());
    let runtime = Arc::new(DockerCli::new());
    let providers = Arc::new(ProviderSet::from_config(&config.providers));
    let cache = Arc::new(RepoCache::new(config.agents.cache_dir.clone()));
    let logs = Arc::new(LogWriter::new(config.logging.dir.clone()));
    let pool = Arc::new(SpawnPool::new(config.agents.max_concurrent, config.agents.queue_size));
    let spawner = Arc::new(AgentSpawner::new(
        runtime.clone(),
        config.agents.max_agents,
        config.agents.timeout_minutes,
        metrics.clone(),
        SystemClock,
    ));

    // A timed-out agent just gets its container stopped; the task that
    // is waiting on the container does the capture and cleanup.
    {
        let stopper = Arc::clone(&spawner);
        spawner.set_on_timeout(move |session| {
            let stopper = Arc::clone(&stopper);
            tokio::spawn(async move {
                if let Err(err) = stopper.stop_container(&session).await {
                    tracing::warn!(agent_id = %session.agent_id, error = %err, "failed to stop timed-out agent");
                }
            });
        });
    }
    let watcher = spawner.clone().spawn_timeout_watcher(cancel.clone());

    let debouncer = Arc::new(Debouncer::new(
        Duration::from_secs(config.agents.debounce_seconds),
        SystemClock,
    ));
    let sweeper = debouncer.clone().spawn_sweeper(cancel.clone());

    let cleaner =
        Arc::new(LogCleaner::new(config.logging.dir.clone(), config.logging.retention_days));
    let cleanup = familiar_engine::logs::spawn_cleanup_scheduler(
        cleaner,
        CLEANUP_INTERVAL,
        cancel.clone(),
    );

    let parser: Option<Arc<dyn IntentParser>> = if config.llm.api_key.is_empty() {
        tracing::info!("no llm api key configured, intent parsing disabled");
        None
    } else {
        Some(Arc::new(LlmIntentParser::new(config.llm.clone())))
    };

    let handler = Arc::new(AgentHandler::new(
        providers.clone(),
        cache,
        pool.clone(),
        spawner.clone(),
        logs,
        config.agents.clone(),
        metrics.clone(),
    ));
    let router = Router::new(config.clone(), providers, debouncer, parser, handler, cancel.clone());

    let state = Arc::new(AppState::new(config.clone(), router, metrics, runtime, spawner.clone()));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|_| ServeError::BadAddress(config.server.host.clone(), config.server.port))?;

    let (ready_tx, ready_rx) = oneshot::channel();
    let server_cancel = cancel.clone();
    let server = tokio::spawn(serve(state, addr, ready_tx, server_cancel));

    match ready_rx.await {
        Ok(bound) => tracing::info!(%bound, "familiar dispatcher listening"),
        Err(_) => {
            // the listener never bound; surface the bind error as fatal
            let result = server.await.unwrap_or(Ok(()));
            cancel.cancel();
            pool.shutdown().await;
            return result;
        }
    }

    wait_for_signal().await;
    tracing::info!("termination signal received, shutting down");
    cancel.cancel();

    let result = match tokio::time::timeout(DRAIN_TIMEOUT + Duration::from_secs(5), server).await {
        Ok(joined) => joined.unwrap_or(Ok(())),
        Err(_) => {
            tracing::warn!("http server did not drain in time");
            Ok(())
        }
    };

    pool.shutdown().await;
    spawner.stop_all().await;
    let _ = watcher.await;
    let _ = sweeper.await;
    let _ = cleanup.await;

    result
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
