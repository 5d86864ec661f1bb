// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live agent bookkeeping.
//!
//! AgentId is distinct from the container id (assigned by the runtime)
//! and the worktree id (the checkout directory name). An agent represents
//! a single containerized invocation handling one event.

use std::borrow::Borrow;
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

/// Unique identifier for an agent instance.
///
/// Formatted as `{forge}-{repo}-{mr}-{timestamp}` by the handler, but the
/// format is opaque to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Borrow<str> for AgentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Status of a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    TimedOut,
}

/// A live agent container plus its bookkeeping.
///
/// Invariant: for every live session there is exactly one worktree
/// directory under the owning repo's cache; both are released on stop.
#[derive(Debug, Clone)]
pub struct Session {
    pub agent_id: AgentId,
    pub container_id: String,
    /// Numeric uid the container runs as (matches the host process).
    pub container_user: u32,
    pub worktree_path: PathBuf,
    pub started_at: Instant,
    pub status: SessionStatus,
}
