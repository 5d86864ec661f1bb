// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent container lifecycle.
//!
//! The spawner owns the session map. Spawn admits up to `max_agents`
//! live sessions, builds the container from a [`SpawnRequest`], and
//! records a [`Session`]. A background watcher flips overdue sessions
//! to timed-out and fires the configured callback on a detached task
//! with a copied session, so the callback can call back into Stop
//! without deadlocking on the session lock.
//!
//! The prompt text never appears in the container command line. The
//! command is one constant bootstrap script; everything event-specific
//! rides in the environment, `FAMILIAR_PROMPT` included.

use crate::logs::LogWriter;
use familiar_adapters::docker::{Bind, ContainerRuntime, ContainerSpec, RuntimeError};
use familiar_core::{AgentId, Clock, Metrics, Session, SessionStatus, SystemClock};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

const STOP_GRACE: Duration = Duration::from_secs(10);
const WATCH_INTERVAL: Duration = Duration::from_secs(30);

/// Constant bootstrap script run as the container command.
///
/// It copies mounted credentials into the writable home, writes a forge
/// CLI config when a self-hosted host is supplied (the token stays in
/// the environment; only the variable name is written), then runs the
/// agent CLI in a detached tmux session driven by `$FAMILIAR_PROMPT`
/// and waits for that session to end.
const BOOTSTRAP_SCRIPT: &str = r#"set -e
if [ -d /claude-auth-src ]; then
  mkdir -p "$HOME/.claude"
  cp -a /claude-auth-src/. "$HOME/.claude/"
fi
if [ -n "$GITLAB_HOST" ]; then
  mkdir -p "$HOME/.config/familiar"
  cat > "$HOME/.config/familiar/forge.json" <<EOF
{"host": "$GITLAB_HOST", "token_env": "GITLAB_TOKEN"}
EOF
fi
tmux new-session -d -s agent 'claude -p "$FAMILIAR_PROMPT"'
while tmux has-session -t agent 2>/dev/null; do
  sleep 5
done
"#;

/// Everything the spawner needs to launch one agent.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub agent_id: AgentId,
    pub image: String,
    pub prompt: String,
    pub worktree_path: PathBuf,
    /// Bare clone backing the worktree, mounted read-only at /cache.
    pub repo_path: PathBuf,
    /// Working directory inside the container, /workspace or below it.
    pub working_dir: String,
    /// Provider credentials for the agent environment.
    pub env: HashMap<String, String>,
    pub network: String,
    pub credentials_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("agent limit reached ({0} live sessions)")]
    MaxAgents(usize),
    #[error("agent {0} is already running")]
    Duplicate(AgentId),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

#[derive(Debug, Error)]
pub enum StopError {
    #[error("no session for agent {0}")]
    UnknownAgent(AgentId),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("failed to write agent log {path}: {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What became of a reaped session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReapOutcome {
    pub timed_out: bool,
}

type TimeoutCallback = Arc<dyn Fn(Session) + Send + Sync>;

pub struct AgentSpawner<C: Clock = SystemClock> {
    runtime: Arc<dyn ContainerRuntime>,
    sessions: Mutex<HashMap<AgentId, Session>>,
    max_agents: usize,
    timeout: Duration,
    clock: C,
    metrics: Arc<Metrics>,
    on_timeout: Mutex<Option<TimeoutCallback>>,
}

impl<C: Clock> AgentSpawner<C> {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        max_agents: usize,
        timeout_minutes: u64,
        metrics: Arc<Metrics>,
        clock: C,
    ) -> Self {
        Self {
            runtime,
            sessions: Mutex::new(HashMap::new()),
            max_agents,
            timeout: Duration::from_secs(timeout_minutes * 60),
            clock,
            metrics,
            on_timeout: Mutex::new(None),
        }
    }

    /// Callback invoked (on a detached task, with a copied session) when
    /// a session exceeds its wall-clock budget.
    pub fn set_on_timeout(&self, callback: impl Fn(Session) + Send + Sync + 'static) {
        *self.on_timeout.lock() = Some(Arc::new(callback));
    }

    pub fn live_sessions(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn session(&self, id: &AgentId) -> Option<Session> {
        self.sessions.lock().get(id).cloned()
    }

    /// Launch a container for the request and record its session.
    pub async fn spawn(&self, request: SpawnRequest) -> Result<(), SpawnError> {
        {
            let sessions = self.sessions.lock();
            if sessions.len() >= self.max_agents {
                return Err(SpawnError::MaxAgents(sessions.len()));
            }
            if sessions.contains_key(&request.agent_id) {
                return Err(SpawnError::Duplicate(request.agent_id.clone()));
            }
        }

        // Run as the host uid so worktree files stay owned by the host
        // user after the container exits.
        let uid = nix::unistd::getuid().as_raw();
        let container_name = format!("familiar-{}", request.agent_id);
        let spec = build_spec(&request, uid);

        let container_id = self.runtime.create(&container_name, &spec).await?;
        if let Err(err) = self.runtime.start(&container_id).await {
            // Half-created containers are removed before surfacing the
            // failure so retries do not collide on the name.
            if let Err(rm) = self.runtime.remove(&container_id).await {
                tracing::warn!(container = %container_id, error = %rm, "failed to remove container after start failure");
            }
            return Err(err.into());
        }

        let session = Session {
            agent_id: request.agent_id.clone(),
            container_id,
            container_user: uid,
            worktree_path: request.worktree_path.clone(),
            started_at: self.clock.now(),
            status: SessionStatus::Running,
        };
        self.sessions.lock().insert(request.agent_id.clone(), session);
        self.metrics.agent_spawned();
        tracing::info!(agent_id = %request.agent_id, image = %request.image, "agent spawned");
        Ok(())
    }

    /// Block until the session's container exits; returns its exit code.
    pub async fn wait(&self, id: &AgentId) -> Result<i64, StopError> {
        let container_id = self.container_of(id)?;
        Ok(self.runtime.wait(&container_id).await?)
    }

    /// Fetch container logs, append them to `log_path`, then stop and
    /// remove the container and delete the session entry. Log capture
    /// is still attempted for timed-out sessions.
    pub async fn capture_and_stop(
        &self,
        id: &AgentId,
        log_path: &Path,
        log_writer: &LogWriter,
    ) -> Result<ReapOutcome, StopError> {
        let session =
            self.sessions.lock().get(id).cloned().ok_or_else(|| StopError::UnknownAgent(id.clone()))?;
        match self.runtime.logs(&session.container_id).await {
            Ok(bytes) => log_writer
                .append(log_path, &bytes)
                .map_err(|source| StopError::Log { path: log_path.to_path_buf(), source })?,
            Err(err) => {
                tracing::warn!(agent_id = %id, error = %err, "failed to fetch container logs")
            }
        }
        self.stop(id).await?;
        Ok(ReapOutcome { timed_out: session.status == SessionStatus::TimedOut })
    }

    /// Stop the container with a grace period, remove it, and delete
    /// the session entry.
    pub async fn stop(&self, id: &AgentId) -> Result<(), StopError> {
        let session = self
            .sessions
            .lock()
            .remove(id)
            .ok_or_else(|| StopError::UnknownAgent(id.clone()))?;
        self.runtime.stop(&session.container_id, STOP_GRACE).await?;
        self.runtime.remove(&session.container_id).await?;
        Ok(())
    }

    /// Stop a session's container without touching the session map.
    ///
    /// The timeout callback uses this: stopping the container wakes the
    /// completion task blocked in [`wait`], which then captures logs and
    /// removes the entry with the timed-out status intact.
    pub async fn stop_container(&self, session: &Session) -> Result<(), StopError> {
        self.runtime.stop(&session.container_id, STOP_GRACE).await?;
        Ok(())
    }

    /// Best-effort stop of every live session; errors are logged, not
    /// aggregated.
    pub async fn stop_all(&self) {
        let ids: Vec<AgentId> = self.sessions.lock().keys().cloned().collect();
        for id in ids {
            if let Err(err) = self.stop(&id).await {
                tracing::warn!(agent_id = %id, error = %err, "failed to stop agent during shutdown");
            }
        }
    }

    /// One pass of the timeout watcher. Overdue running sessions flip
    /// to timed-out under the lock; callbacks fire afterwards on
    /// detached tasks against copies.
    pub fn check_timeouts_once(&self) {
        if self.timeout.is_zero() {
            return;
        }
        let now = self.clock.now();
        let mut expired = Vec::new();
        {
            let mut sessions = self.sessions.lock();
            for session in sessions.values_mut() {
                if session.status == SessionStatus::Running
                    && now.duration_since(session.started_at) > self.timeout
                {
                    session.status = SessionStatus::TimedOut;
                    expired.push(session.clone());
                }
            }
        }
        let callback = self.on_timeout.lock().clone();
        for session in expired {
            self.metrics.agent_timed_out();
            tracing::warn!(agent_id = %session.agent_id, "agent exceeded its time budget");
            if let Some(callback) = &callback {
                let callback = Arc::clone(callback);
                tokio::spawn(async move { callback(session) });
            }
        }
    }

    fn container_of(&self, id: &AgentId) -> Result<String, StopError> {
        self.sessions
            .lock()
            .get(id)
            .map(|s| s.container_id.clone())
            .ok_or_else(|| StopError::UnknownAgent(id.clone()))
    }
}

impl<C: Clock + 'static> AgentSpawner<C> {
    /// Periodic timeout sweep; stops when the token is cancelled.
    pub fn spawn_timeout_watcher(
        self: Arc<Self>,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let spawner = self;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(WATCH_INTERVAL);
            tick.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tick.tick() => spawner.check_timeouts_once(),
                }
            }
        })
    }
}

fn build_spec(request: &SpawnRequest, uid: u32) -> ContainerSpec {
    let mut env: Vec<(String, String)> = request.env.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    env.sort();
    env.push(("HOME".to_string(), "/home/agent".to_string()));
    env.push(("FAMILIAR_PROMPT".to_string(), request.prompt.clone()));

    let mut binds = vec![
        Bind {
            host_path: request.worktree_path.display().to_string(),
            container_path: "/workspace".to_string(),
            read_only: false,
        },
        Bind {
            host_path: request.repo_path.display().to_string(),
            container_path: "/cache".to_string(),
            read_only: true,
        },
    ];
    if let Some(dir) = &request.credentials_dir {
        binds.push(Bind {
            host_path: dir.display().to_string(),
            container_path: "/claude-auth-src".to_string(),
            read_only: true,
        });
    }

    ContainerSpec {
        image: request.image.clone(),
        command: vec!["/bin/sh".to_string(), "-c".to_string(), BOOTSTRAP_SCRIPT.to_string()],
        env,
        binds,
        // 0777 so the non-root container user owns its whole home.
        tmpfs: vec![("/home/agent".to_string(), "rw,mode=0777".to_string())],
        network: request.network.clone(),
        labels: vec![
            ("familiar.agent".to_string(), "true".to_string()),
            ("familiar.agent.id".to_string(), request.agent_id.to_string()),
        ],
        user: Some(uid),
        working_dir: Some(request.working_dir.clone()),
    }
}

#[cfg(test)]
#[path = "spawner_tests.rs"]
mod tests;
