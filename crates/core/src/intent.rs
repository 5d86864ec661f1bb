// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured distillation of a free-form user comment.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A privileged action a comment may ask the agent to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestedAction {
    Merge,
    Approve,
    DismissReviews,
    Push,
}

impl fmt::Display for RequestedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestedAction::Merge => write!(f, "merge"),
            RequestedAction::Approve => write!(f, "approve"),
            RequestedAction::DismissReviews => write!(f, "dismiss_reviews"),
            RequestedAction::Push => write!(f, "push"),
        }
    }
}

/// Parsed intent of a user comment.
///
/// Created once per comment event, consumed by the prompt builder and
/// permission evaluation. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedIntent {
    /// Instructions distilled from the comment text.
    pub instructions: String,
    /// Privileged actions the comment explicitly asks for.
    #[serde(default)]
    pub requested_actions: Vec<RequestedAction>,
    /// Classifier confidence in [0, 1].
    pub confidence: f64,
    /// The original comment text.
    #[serde(default)]
    pub raw_text: String,
}

impl ParsedIntent {
    pub fn requests(&self, action: RequestedAction) -> bool {
        self.requested_actions.contains(&action)
    }

    /// True when the distilled instructions carry any content.
    pub fn has_instructions(&self) -> bool {
        !self.instructions.trim().is_empty()
    }
}

#[cfg(test)]
#[path = "intent_tests.rs"]
mod tests;
