// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic agent prompt composition.
//!
//! The prompt is assembled from fixed sections joined by blank lines:
//! event context, the configured base template, user instructions from
//! the parsed intent, the resolved permission grants, and a safety
//! reminder. Same event + config + intent always yields the same text.

use familiar_config::{MergedConfig, PermissionPolicy};
use familiar_core::{Event, ParsedIntent, RequestedAction};

const SAFETY_REMINDER: &str = "Safety: respect branch protection rules. Never force-push. \
If you are uncertain whether an action is wanted, ask via a comment on the merge request \
instead of acting.";

pub fn build_prompt(event: &Event, config: &MergedConfig, intent: Option<&ParsedIntent>) -> String {
    let mut sections = vec![context_section(event), base_section(event, config)];
    if let Some(intent) = intent {
        if intent.has_instructions() {
            sections.push(format!("User Instructions:\n{}", intent.instructions.trim()));
        }
    }
    sections.push(permissions_section(config, intent));
    sections.push(SAFETY_REMINDER.to_string());
    sections.join("\n\n")
}

fn context_section(event: &Event) -> String {
    let mut lines = vec![
        format!("Repository: {}/{} ({})", event.repo_owner, event.repo_name, event.forge),
        format!(
            "Merge request #{}: {} -> {}",
            event.mr_number, event.source_branch, event.target_branch
        ),
    ];
    if !event.mr_title.is_empty() {
        lines.push(format!("Title: {}", event.mr_title));
    }
    if !event.mr_description.is_empty() {
        lines.push(format!("Description: {}", event.mr_description));
    }
    if let Some(comment) = &event.comment {
        lines.push(format!("Comment by {}:", comment.author));
        lines.push(comment.body.clone());
        if let Some(path) = &comment.file_path {
            match comment.line {
                Some(line) => {
                    lines.push(format!("File: {} (line {})", path, line));
                    lines.push(
                        "This comment pins a specific line; focus your attention there."
                            .to_string(),
                    );
                }
                None => lines.push(format!("File: {}", path)),
            }
        }
        if let Some(thread) = &comment.thread_id {
            lines.push(format!("Thread: {}", thread));
            lines.push("Reply within this thread when responding.".to_string());
        }
    }
    lines.join("\n")
}

fn base_section(event: &Event, config: &MergedConfig) -> String {
    config
        .prompts
        .for_kind(event.kind)
        .replace("{MR_NUMBER}", &event.mr_number.to_string())
        .replace("{REPO_OWNER}", &event.repo_owner)
        .replace("{REPO_NAME}", &event.repo_name)
}

fn permissions_section(config: &MergedConfig, intent: Option<&ParsedIntent>) -> String {
    let lines = [
        permission_line(
            config.permissions.merge,
            intent,
            RequestedAction::Merge,
            "merge this merge request",
            false,
        ),
        permission_line(
            config.permissions.approve,
            intent,
            RequestedAction::Approve,
            "approve this merge request",
            false,
        ),
        permission_line(
            config.permissions.push_commits,
            intent,
            RequestedAction::Push,
            "push commits to the source branch",
            true,
        ),
        permission_line(
            config.permissions.dismiss_reviews,
            intent,
            RequestedAction::DismissReviews,
            "dismiss existing reviews",
            false,
        ),
    ];
    format!("Permissions:\n{}", lines.join("\n"))
}

/// The resolution table: always -> SHOULD, never -> must NOT,
/// on_request -> MAY when requested, otherwise must NOT.
///
/// `implicit_on_mr_event` is the carve-out for push_commits: every event
/// the dispatcher handles concerns a merge request, and responding to
/// reviews routinely requires code changes, so on_request grants MAY
/// even without an explicit ask. Merge never gets this.
fn permission_line(
    policy: PermissionPolicy,
    intent: Option<&ParsedIntent>,
    action: RequestedAction,
    verb: &str,
    implicit_on_mr_event: bool,
) -> String {
    match policy {
        PermissionPolicy::Always => format!("- You SHOULD {}.", verb),
        PermissionPolicy::Never => format!("- You must NOT {}.", verb),
        PermissionPolicy::OnRequest => {
            let requested = intent.is_some_and(|i| i.requests(action));
            if requested {
                format!("- You MAY {}; the user asked for it.", verb)
            } else if implicit_on_mr_event {
                format!("- You MAY {}; review responses routinely require code changes.", verb)
            } else {
                format!("- You must NOT {}; it was not requested.", verb)
            }
        }
    }
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
