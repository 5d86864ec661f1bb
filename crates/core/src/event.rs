// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical merge-request event model.
//!
//! Both forge dialects normalize into [`Event`]; everything downstream of
//! the webhook endpoints (router, handler, prompt builder) only ever sees
//! this shape. Events are immutable after construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hosted git forge dialect an event originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Forge {
    GitHub,
    GitLab,
}

impl fmt::Display for Forge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Forge::GitHub => write!(f, "github"),
            Forge::GitLab => write!(f, "gitlab"),
        }
    }
}

/// Canonical event kind, collapsing both dialects' vocabularies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MrOpened,
    MrComment,
    MrUpdated,
    Mention,
}

impl EventKind {
    /// True for kinds that carry a comment body (and therefore an intent).
    pub fn has_comment(&self) -> bool {
        matches!(self, EventKind::MrComment | EventKind::Mention)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MrOpened => "mr_opened",
            EventKind::MrComment => "mr_comment",
            EventKind::MrUpdated => "mr_updated",
            EventKind::Mention => "mention",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Comment details present on `mr_comment` and `mention` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentInfo {
    pub id: String,
    pub body: String,
    pub author: String,
    /// File the comment is attached to, for diff comments.
    pub file_path: Option<String>,
    /// Line within `file_path`, when the comment pins a specific line.
    pub line: Option<u64>,
    /// Discussion/thread id, when the comment belongs to a thread.
    pub thread_id: Option<String>,
}

/// A normalized merge-request lifecycle event.
///
/// Created by the normalizer, consumed by the router, handed by reference
/// through the handler. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub forge: Forge,
    pub repo_owner: String,
    pub repo_name: String,
    pub clone_url: String,
    pub mr_number: u64,
    pub mr_title: String,
    pub mr_description: String,
    pub source_branch: String,
    pub target_branch: String,
    pub comment: Option<CommentInfo>,
    /// User who triggered the event.
    pub actor: String,
    /// Arrival time at this dispatcher, not the forge-side timestamp.
    pub received_at: DateTime<Utc>,
    /// Original webhook body, kept for diagnostics.
    #[serde(skip)]
    pub raw_payload: Vec<u8>,
}

impl Event {
    /// Debounce identity key: `forge/owner/name/kind/mr_number`.
    ///
    /// The comment id is deliberately excluded so comment bursts on the
    /// same MR collapse into one key.
    pub fn dedupe_key(&self) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.forge, self.repo_owner, self.repo_name, self.kind, self.mr_number
        )
    }

    /// Comment body, when this event kind carries one.
    pub fn comment_body(&self) -> Option<&str> {
        self.comment.as_ref().map(|c| c.body.as_str())
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
