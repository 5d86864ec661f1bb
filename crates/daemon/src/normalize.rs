// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dialect payload -> canonical event translation.
//!
//! Each dialect's envelope is decoded into the handful of fields the
//! dispatcher cares about. Actions outside the documented set are
//! rejected as not handled, which the webhook layer reports as a 400 --
//! forges deliver far more event types than this system reacts to.

use chrono::Utc;
use familiar_core::{CommentInfo, Event, EventKind, Forge};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("event not handled: {0}")]
    NotHandled(String),
    #[error("malformed payload: {0}")]
    Malformed(String),
}

// ---------------------------------------------------------------------
// GitHub

#[derive(Debug, Deserialize)]
struct GitHubEnvelope {
    #[serde(default)]
    action: String,
    #[serde(default)]
    number: Option<u64>,
    pull_request: Option<GitHubPullRequest>,
    issue: Option<GitHubIssue>,
    comment: Option<GitHubComment>,
    repository: Option<GitHubRepository>,
    sender: Option<GitHubUser>,
}

#[derive(Debug, Deserialize)]
struct GitHubPullRequest {
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: Option<String>,
    head: GitHubRef,
    base: GitHubRef,
}

#[derive(Debug, Deserialize)]
struct GitHubRef {
    #[serde(rename = "ref")]
    branch: String,
}

#[derive(Debug, Deserialize)]
struct GitHubIssue {
    number: u64,
    #[serde(default)]
    title: String,
    /// Present only when the issue is a pull request.
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GitHubComment {
    id: u64,
    #[serde(default)]
    body: String,
    user: Option<GitHubUser>,
}

#[derive(Debug, Deserialize)]
struct GitHubRepository {
    full_name: String,
    #[serde(default)]
    clone_url: String,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

/// Translate a GitHub delivery. `event_type` is the `X-GitHub-Event`
/// header; `mention_token` is the configured bot username.
pub fn normalize_github(
    event_type: &str,
    body: &[u8],
    mention_token: &str,
) -> Result<Event, NormalizeError> {
    let envelope: GitHubEnvelope = serde_json::from_slice(body)
        .map_err(|err| NormalizeError::Malformed(err.to_string()))?;
    let repository = envelope
        .repository
        .as_ref()
        .ok_or_else(|| NormalizeError::Malformed("missing repository".into()))?;
    let (owner, name) = split_full_path(&repository.full_name)?;
    let actor = envelope.sender.as_ref().map(|u| u.login.clone()).unwrap_or_default();

    match event_type {
        "pull_request" => {
            let kind = match envelope.action.as_str() {
                "opened" => EventKind::MrOpened,
                "synchronize" => EventKind::MrUpdated,
                other => {
                    return Err(NormalizeError::NotHandled(format!(
                        "pull_request action {:?}",
                        other
                    )))
                }
            };
            let pr = envelope
                .pull_request
                .as_ref()
                .ok_or_else(|| NormalizeError::Malformed("missing pull_request".into()))?;
            let mr_number = envelope
                .number
                .ok_or_else(|| NormalizeError::Malformed("missing number".into()))?;
            Ok(Event {
                kind,
                forge: Forge::GitHub,
                repo_owner: owner,
                repo_name: name,
                clone_url: repository.clone_url.clone(),
                mr_number,
                mr_title: pr.title.clone(),
                mr_description: pr.body.clone().unwrap_or_default(),
                source_branch: pr.head.branch.clone(),
                target_branch: pr.base.branch.clone(),
                comment: None,
                actor,
                received_at: Utc::now(),
                raw_payload: body.to_vec(),
            })
        }
        "issue_comment" => {
            if envelope.action != "created" {
                return Err(NormalizeError::NotHandled(format!(
                    "issue_comment action {:?}",
                    envelope.action
                )));
            }
            let issue = envelope
                .issue
                .as_ref()
                .ok_or_else(|| NormalizeError::Malformed("missing issue".into()))?;
            if issue.pull_request.is_none() {
                return Err(NormalizeError::NotHandled(
                    "comment on an issue without a pull request".into(),
                ));
            }
            let comment = envelope
                .comment
                .as_ref()
                .ok_or_else(|| NormalizeError::Malformed("missing comment".into()))?;
            let kind = if contains_mention(&comment.body, mention_token) {
                EventKind::Mention
            } else {
                EventKind::MrComment
            };
            Ok(Event {
                kind,
                forge: Forge::GitHub,
                repo_owner: owner,
                repo_name: name,
                clone_url: repository.clone_url.clone(),
                mr_number: issue.number,
                mr_title: issue.title.clone(),
                mr_description: String::new(),
                // issue_comment deliveries carry no branch data; the
                // handler falls back to the default branch.
                source_branch: String::new(),
                target_branch: String::new(),
                comment: Some(CommentInfo {
                    id: comment.id.to_string(),
                    body: comment.body.clone(),
                    author: comment.user.as_ref().map(|u| u.login.clone()).unwrap_or_default(),
                    file_path: None,
                    line: None,
                    thread_id: None,
                }),
                actor,
                received_at: Utc::now(),
                raw_payload: body.to_vec(),
            })
        }
        other => Err(NormalizeError::NotHandled(format!("event type {:?}", other))),
    }
}

// ---------------------------------------------------------------------
// GitLab

#[derive(Debug, Deserialize)]
struct GitLabEnvelope {
    #[serde(default)]
    object_kind: String,
    user: Option<GitLabUser>,
    project: Option<GitLabProject>,
    object_attributes: Option<GitLabAttributes>,
    merge_request: Option<GitLabMergeRequest>,
}

#[derive(Debug, Deserialize)]
struct GitLabUser {
    username: String,
}

#[derive(Debug, Deserialize)]
struct GitLabProject {
    path_with_namespace: String,
    #[serde(default)]
    git_http_url: String,
}

#[derive(Debug, Deserialize)]
struct GitLabAttributes {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    iid: Option<u64>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    source_branch: String,
    #[serde(default)]
    target_branch: String,
    #[serde(default)]
    action: String,
    #[serde(default)]
    note: String,
    #[serde(default)]
    noteable_type: String,
    #[serde(default)]
    discussion_id: Option<String>,
    position: Option<GitLabPosition>,
}

#[derive(Debug, Deserialize)]
struct GitLabPosition {
    #[serde(default)]
    new_path: Option<String>,
    #[serde(default)]
    new_line: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GitLabMergeRequest {
    iid: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    source_branch: String,
    #[serde(default)]
    target_branch: String,
}

/// Translate a GitLab delivery; the object kind rides in the body.
pub fn normalize_gitlab(body: &[u8], mention_token: &str) -> Result<Event, NormalizeError> {
    let envelope: GitLabEnvelope = serde_json::from_slice(body)
        .map_err(|err| NormalizeError::Malformed(err.to_string()))?;
    let project = envelope
        .project
        .as_ref()
        .ok_or_else(|| NormalizeError::Malformed("missing project".into()))?;
    let (owner, name) = split_full_path(&project.path_with_namespace)?;
    let actor = envelope.user.as_ref().map(|u| u.username.clone()).unwrap_or_default();
    let attributes = envelope
        .object_attributes
        .as_ref()
        .ok_or_else(|| NormalizeError::Malformed("missing object_attributes".into()))?;

    match envelope.object_kind.as_str() {
        "merge_request" => {
            let kind = match attributes.action.as_str() {
                "open" => EventKind::MrOpened,
                "update" => EventKind::MrUpdated,
                other => {
                    return Err(NormalizeError::NotHandled(format!(
                        "merge_request action {:?}",
                        other
                    )))
                }
            };
            let mr_number = attributes
                .iid
                .ok_or_else(|| NormalizeError::Malformed("missing iid".into()))?;
            Ok(Event {
                kind,
                forge: Forge::GitLab,
                repo_owner: owner,
                repo_name: name,
                clone_url: project.git_http_url.clone(),
                mr_number,
                mr_title: attributes.title.clone(),
                mr_description: attributes.description.clone(),
                source_branch: attributes.source_branch.clone(),
                target_branch: attributes.target_branch.clone(),
                comment: None,
                actor,
                received_at: Utc::now(),
                raw_payload: body.to_vec(),
            })
        }
        "note" => {
            if attributes.noteable_type != "MergeRequest" {
                return Err(NormalizeError::NotHandled(format!(
                    "note on {:?}",
                    attributes.noteable_type
                )));
            }
            let mr = envelope
                .merge_request
                .as_ref()
                .ok_or_else(|| NormalizeError::Malformed("missing merge_request".into()))?;
            let kind = if contains_mention(&attributes.note, mention_token) {
                EventKind::Mention
            } else {
                EventKind::MrComment
            };
            let comment_id = attributes
                .id
                .ok_or_else(|| NormalizeError::Malformed("missing note id".into()))?;
            Ok(Event {
                kind,
                forge: Forge::GitLab,
                repo_owner: owner,
                repo_name: name,
                clone_url: project.git_http_url.clone(),
                mr_number: mr.iid,
                mr_title: mr.title.clone(),
                mr_description: mr.description.clone(),
                source_branch: mr.source_branch.clone(),
                target_branch: mr.target_branch.clone(),
                comment: Some(CommentInfo {
                    id: comment_id.to_string(),
                    body: attributes.note.clone(),
                    author: actor.clone(),
                    file_path: attributes.position.as_ref().and_then(|p| p.new_path.clone()),
                    line: attributes.position.as_ref().and_then(|p| p.new_line),
                    thread_id: attributes.discussion_id.clone(),
                }),
                actor,
                received_at: Utc::now(),
                raw_payload: body.to_vec(),
            })
        }
        other => Err(NormalizeError::NotHandled(format!("object kind {:?}", other))),
    }
}

/// Split `owner/name` (subgroups fold into the owner part).
fn split_full_path(full: &str) -> Result<(String, String), NormalizeError> {
    match full.rsplit_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
            Ok((owner.to_string(), name.to_string()))
        }
        _ => Err(NormalizeError::Malformed(format!("malformed repository path {:?}", full))),
    }
}

/// Case-insensitive `@<token>` match.
fn contains_mention(body: &str, mention_token: &str) -> bool {
    if mention_token.is_empty() {
        return false;
    }
    body.to_lowercase().contains(&format!("@{}", mention_token.to_lowercase()))
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
