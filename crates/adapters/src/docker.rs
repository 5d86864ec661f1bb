// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container runtime behind a narrow capability trait.
//!
//! The dispatcher only needs create/start/stop/remove/logs and a health
//! probe; [`DockerCli`] satisfies that by shelling out to the docker CLI.
//! The spawner depends on the trait so its lifecycle and timeout logic
//! can be tested without a docker daemon.

use crate::subprocess::{self, SubprocessError, DOCKER_TIMEOUT};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// A bind mount from the host into the container.
#[derive(Debug, Clone)]
pub struct Bind {
    pub host_path: String,
    pub container_path: String,
    pub read_only: bool,
}

/// Everything needed to create one agent container.
#[derive(Debug, Clone, Default)]
pub struct ContainerSpec {
    pub image: String,
    /// Full command line, e.g. `["/bin/sh", "-c", script]`.
    pub command: Vec<String>,
    pub env: Vec<(String, String)>,
    pub binds: Vec<Bind>,
    /// Tmpfs mounts as `(path, options)`, e.g. `("/home/agent", "rw,mode=0777")`.
    pub tmpfs: Vec<(String, String)>,
    pub network: String,
    pub labels: Vec<(String, String)>,
    /// Numeric uid to run as; keeps bind-mounted files host-owned.
    pub user: Option<u32>,
    pub working_dir: Option<String>,
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("docker {op} failed: {message}")]
    CommandFailed { op: &'static str, message: String },
    #[error(transparent)]
    Subprocess(#[from] SubprocessError),
}

/// Capability set the spawner needs from a container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create a container and return its id.
    async fn create(&self, name: &str, spec: &ContainerSpec) -> Result<String, RuntimeError>;
    async fn start(&self, id: &str) -> Result<(), RuntimeError>;
    /// Stop with a grace period before the runtime kills the process.
    async fn stop(&self, id: &str, grace: Duration) -> Result<(), RuntimeError>;
    /// Force-remove the container.
    async fn remove(&self, id: &str) -> Result<(), RuntimeError>;
    /// Block until the container exits; returns its exit code.
    async fn wait(&self, id: &str) -> Result<i64, RuntimeError>;
    /// Combined stdout/stderr of the container.
    async fn logs(&self, id: &str) -> Result<Vec<u8>, RuntimeError>;
    /// Health probe for `GET /health`.
    async fn ping(&self) -> bool;
}

/// Docker CLI runtime. Container lifecycle goes through the `docker`
/// binary, matching how operators interact with the daemon.
#[derive(Debug, Clone, Default)]
pub struct DockerCli;

impl DockerCli {
    pub fn new() -> Self {
        Self
    }

    /// Argument list for `docker create`, split out for tests.
    fn create_args(name: &str, spec: &ContainerSpec) -> Vec<String> {
        let mut args = vec!["create".to_string(), "--name".to_string(), name.to_string()];
        if !spec.network.is_empty() {
            args.push("--network".to_string());
            args.push(spec.network.clone());
        }
        if let Some(uid) = spec.user {
            args.push("--user".to_string());
            args.push(uid.to_string());
        }
        if let Some(dir) = &spec.working_dir {
            args.push("--workdir".to_string());
            args.push(dir.clone());
        }
        for (key, value) in &spec.labels {
            args.push("--label".to_string());
            args.push(format!("{}={}", key, value));
        }
        for (key, value) in &spec.env {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }
        for bind in &spec.binds {
            let mut mount = format!("{}:{}", bind.host_path, bind.container_path);
            if bind.read_only {
                mount.push_str(":ro");
            }
            args.push("-v".to_string());
            args.push(mount);
        }
        for (path, options) in &spec.tmpfs {
            args.push("--tmpfs".to_string());
            args.push(format!("{}:{}", path, options));
        }
        args.push(spec.image.clone());
        args.extend(spec.command.iter().cloned());
        args
    }

    async fn run(
        &self,
        op: &'static str,
        args: &[String],
        timeout: Duration,
    ) -> Result<String, RuntimeError> {
        let mut cmd = Command::new("docker");
        cmd.args(args);
        let output = subprocess::run_with_timeout(cmd, timeout, op).await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(RuntimeError::CommandFailed { op, message: stderr.trim().to_string() })
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn create(&self, name: &str, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let args = Self::create_args(name, spec);
        self.run("create", &args, DOCKER_TIMEOUT).await
    }

    async fn start(&self, id: &str) -> Result<(), RuntimeError> {
        self.run("start", &["start".to_string(), id.to_string()], DOCKER_TIMEOUT).await?;
        Ok(())
    }

    async fn stop(&self, id: &str, grace: Duration) -> Result<(), RuntimeError> {
        let args =
            vec!["stop".to_string(), "-t".to_string(), grace.as_secs().to_string(), id.to_string()];
        // The CLI waits out the grace period, so budget past it.
        self.run("stop", &args, grace + DOCKER_TIMEOUT).await?;
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), RuntimeError> {
        self.run("rm", &["rm".to_string(), "-f".to_string(), id.to_string()], DOCKER_TIMEOUT)
            .await?;
        Ok(())
    }

    async fn wait(&self, id: &str) -> Result<i64, RuntimeError> {
        // Agents run for minutes to hours; the timeout watcher stops
        // overdue containers, which also releases this wait. The budget
        // here is only a backstop against a vanished daemon.
        let stdout =
            self.run("wait", &["wait".to_string(), id.to_string()], Duration::from_secs(86_400))
                .await?;
        stdout.trim().parse().map_err(|_| RuntimeError::CommandFailed {
            op: "wait",
            message: format!("unparseable exit code {:?}", stdout),
        })
    }

    async fn logs(&self, id: &str) -> Result<Vec<u8>, RuntimeError> {
        let mut cmd = Command::new("docker");
        cmd.args(["logs", id]);
        let output = subprocess::run_with_timeout(cmd, DOCKER_TIMEOUT, "logs").await?;
        if output.status.success() {
            // Interleave is acceptable; log capture is best-effort ordering.
            let mut bytes = output.stdout;
            bytes.extend_from_slice(&output.stderr);
            Ok(bytes)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(RuntimeError::CommandFailed { op: "logs", message: stderr.trim().to_string() })
        }
    }

    async fn ping(&self) -> bool {
        let mut cmd = Command::new("docker");
        cmd.args(["version", "--format", "{{.Server.Version}}"]);
        match subprocess::run_with_timeout(cmd, Duration::from_secs(5), "version").await {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
#[path = "docker_tests.rs"]
mod tests;
