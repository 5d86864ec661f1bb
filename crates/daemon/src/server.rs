// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surface: webhook endpoints, health, metrics.
//!
//! The listener binds first and reports its actual address through the
//! ready channel (port 0 is how tests learn their port), then serves
//! until the cancellation token fires. In-flight requests get a bounded
//! drain window.

use crate::webhook;
use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use familiar_adapters::docker::ContainerRuntime;
use familiar_config::ServerConfig;
use familiar_core::{Metrics, MetricsSnapshot, SystemClock};
use familiar_engine::{AgentSpawner, Router as EventRouter};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub router: EventRouter<SystemClock>,
    pub metrics: Arc<Metrics>,
    pub runtime: Arc<dyn ContainerRuntime>,
    pub spawner: Arc<AgentSpawner<SystemClock>>,
}

impl AppState {
    pub fn new(
        config: Arc<ServerConfig>,
        router: EventRouter<SystemClock>,
        metrics: Arc<Metrics>,
        runtime: Arc<dyn ContainerRuntime>,
        spawner: Arc<AgentSpawner<SystemClock>>,
    ) -> Self {
        Self { config, router, metrics, runtime, spawner }
    }
}

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("invalid listen address {0}:{1}")]
    BadAddress(String, u16),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("http server failed: {0}")]
    Serve(#[source] std::io::Error),
}

pub fn app(state: Arc<AppState>) -> axum::Router {
    axum::Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/webhook/github", post(webhook::github_webhook))
        .route("/webhook/gitlab", post(webhook::gitlab_webhook))
        .with_state(state)
}

/// Bind, report the bound address on `ready`, serve until cancelled.
pub async fn serve(
    state: Arc<AppState>,
    addr: SocketAddr,
    ready: oneshot::Sender<SocketAddr>,
    cancel: CancellationToken,
) -> Result<(), ServeError> {
    let listener =
        TcpListener::bind(addr).await.map_err(|source| ServeError::Bind { addr, source })?;
    let bound = listener.local_addr().map_err(|source| ServeError::Bind { addr, source })?;
    let _ = ready.send(bound);

    let shutdown = cancel.clone();
    let server = axum::serve(listener, app(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await });

    tokio::select! {
        result = server => result.map_err(ServeError::Serve),
        _ = async {
            cancel.cancelled().await;
            tokio::time::sleep(DRAIN_TIMEOUT).await;
        } => {
            tracing::warn!("in-flight requests did not drain in time");
            Ok(())
        }
    }
}

/// `degraded` when the container runtime does not answer; the
/// dispatcher itself keeps running either way.
async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let docker = state.runtime.ping().await;
    let status = if docker { "ok" } else { "degraded" };
    Json(json!({
        "status": status,
        "checks": {
            "docker": docker,
            "active_agents": state.spawner.live_sessions(),
        }
    }))
}

async fn metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
