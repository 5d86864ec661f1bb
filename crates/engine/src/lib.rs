// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! familiar-engine: the event-to-agent pipeline.
//!
//! Normalized events enter through the [`Router`], which filters and
//! debounces them, resolves per-repo configuration, and hands accepted
//! events to the [`AgentHandler`]. The handler materializes an isolated
//! worktree from the [`RepoCache`], builds the agent prompt, and
//! enqueues a spawn on the [`SpawnPool`]; the [`AgentSpawner`] owns the
//! container lifecycle from there.

pub mod cache;
pub mod debounce;
#[cfg(test)]
pub(crate) mod test_support;
pub mod handler;
pub mod logs;
pub mod pool;
pub mod prompt;
pub mod router;
pub mod spawner;

pub use cache::{CacheError, RepoCache};
pub use debounce::Debouncer;
pub use handler::{AgentHandler, HandleError};
pub use logs::{LogCleaner, LogWriter};
pub use pool::{EnqueueError, SpawnPool};
pub use prompt::build_prompt;
pub use router::{EventHandler, RouteError, RouteOutcome, Router};
pub use spawner::{AgentSpawner, ReapOutcome, SpawnError, SpawnRequest, StopError};
