// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use yare::parameterized;

fn github_pr_body(action: &str) -> Vec<u8> {
    json!({
        "action": action,
        "number": 42,
        "pull_request": {
            "title": "Add frobnicator",
            "body": "Implements frobnication.",
            "head": {"ref": "feature"},
            "base": {"ref": "main"},
            "user": {"login": "alice"}
        },
        "repository": {
            "full_name": "o/r",
            "clone_url": "https://github.com/o/r.git"
        },
        "sender": {"login": "alice"}
    })
    .to_string()
    .into_bytes()
}

fn github_comment_body(comment: &str, on_pr: bool) -> Vec<u8> {
    let mut issue = json!({"number": 7, "title": "Fix the tests"});
    if on_pr {
        issue["pull_request"] = json!({"url": "https://api.github.com/repos/o/r/pulls/7"});
    }
    json!({
        "action": "created",
        "issue": issue,
        "comment": {"id": 991, "body": comment, "user": {"login": "bob"}},
        "repository": {"full_name": "o/r", "clone_url": "https://github.com/o/r.git"},
        "sender": {"login": "bob"}
    })
    .to_string()
    .into_bytes()
}

#[parameterized(
    opened = { "opened", EventKind::MrOpened },
    synchronize = { "synchronize", EventKind::MrUpdated },
)]
fn github_pull_request_actions(action: &str, expected: EventKind) {
    let event = normalize_github("pull_request", &github_pr_body(action), "familiar").unwrap();
    assert_eq!(event.kind, expected);
    assert_eq!(event.forge, Forge::GitHub);
    assert_eq!(event.repo_owner, "o");
    assert_eq!(event.repo_name, "r");
    assert_eq!(event.mr_number, 42);
    assert_eq!(event.source_branch, "feature");
    assert_eq!(event.target_branch, "main");
    assert_eq!(event.actor, "alice");
    assert!(!event.raw_payload.is_empty());
}

#[parameterized(
    closed = { "closed" },
    reopened = { "reopened" },
    labeled = { "labeled" },
)]
fn github_other_pr_actions_are_not_handled(action: &str) {
    let err = normalize_github("pull_request", &github_pr_body(action), "familiar").unwrap_err();
    assert!(matches!(err, NormalizeError::NotHandled(_)));
}

#[test]
fn github_unknown_event_type_is_not_handled() {
    let err = normalize_github("workflow_run", &github_pr_body("opened"), "familiar").unwrap_err();
    assert!(matches!(err, NormalizeError::NotHandled(_)));
}

#[test]
fn github_pr_comment_normalizes() {
    let event =
        normalize_github("issue_comment", &github_comment_body("please fix", true), "familiar")
            .unwrap();
    assert_eq!(event.kind, EventKind::MrComment);
    assert_eq!(event.mr_number, 7);
    let comment = event.comment.unwrap();
    assert_eq!(comment.id, "991");
    assert_eq!(comment.author, "bob");
    assert_eq!(comment.body, "please fix");
}

#[parameterized(
    lowercase = { "@familiar please review" },
    uppercase = { "@FAMILIAR please review" },
    mixed = { "hey @FaMiLiAr, thoughts?" },
)]
fn github_mention_detection_is_case_insensitive(body: &str) {
    let event =
        normalize_github("issue_comment", &github_comment_body(body, true), "familiar").unwrap();
    assert_eq!(event.kind, EventKind::Mention);
}

#[test]
fn github_comment_without_mention_stays_comment() {
    let event = normalize_github(
        "issue_comment",
        &github_comment_body("familiar code, no at-sign", true),
        "familiar",
    )
    .unwrap();
    assert_eq!(event.kind, EventKind::MrComment);
}

#[test]
fn github_comment_on_plain_issue_is_not_handled() {
    let err =
        normalize_github("issue_comment", &github_comment_body("hello", false), "familiar")
            .unwrap_err();
    assert!(matches!(err, NormalizeError::NotHandled(_)));
}

#[test]
fn github_malformed_repository_path_is_rejected() {
    let body = json!({
        "action": "opened",
        "number": 1,
        "pull_request": {"title": "", "head": {"ref": "a"}, "base": {"ref": "b"}},
        "repository": {"full_name": "no-slash", "clone_url": ""},
        "sender": {"login": "x"}
    })
    .to_string();
    let err = normalize_github("pull_request", body.as_bytes(), "familiar").unwrap_err();
    assert!(matches!(err, NormalizeError::Malformed(_)));
}

#[test]
fn github_garbage_body_is_malformed() {
    let err = normalize_github("pull_request", b"not json", "familiar").unwrap_err();
    assert!(matches!(err, NormalizeError::Malformed(_)));
}

fn gitlab_mr_body(action: &str) -> Vec<u8> {
    json!({
        "object_kind": "merge_request",
        "user": {"username": "carol"},
        "project": {
            "path_with_namespace": "group/tool",
            "git_http_url": "https://gitlab.com/group/tool.git"
        },
        "object_attributes": {
            "iid": 10,
            "title": "Refactor pipeline",
            "description": "Cleanup.",
            "source_branch": "refactor",
            "target_branch": "main",
            "action": action
        }
    })
    .to_string()
    .into_bytes()
}

fn gitlab_note_body(note: &str, noteable: &str) -> Vec<u8> {
    json!({
        "object_kind": "note",
        "user": {"username": "carol"},
        "project": {
            "path_with_namespace": "group/sub/tool",
            "git_http_url": "https://gitlab.com/group/sub/tool.git"
        },
        "object_attributes": {
            "id": 555,
            "note": note,
            "noteable_type": noteable,
            "discussion_id": "d1f2",
            "position": {"new_path": "src/main.rs", "new_line": 14}
        },
        "merge_request": {
            "iid": 10,
            "title": "Refactor pipeline",
            "description": "Cleanup.",
            "source_branch": "refactor",
            "target_branch": "main"
        }
    })
    .to_string()
    .into_bytes()
}

#[parameterized(
    open = { "open", EventKind::MrOpened },
    update = { "update", EventKind::MrUpdated },
)]
fn gitlab_merge_request_actions(action: &str, expected: EventKind) {
    let event = normalize_gitlab(&gitlab_mr_body(action), "familiar").unwrap();
    assert_eq!(event.kind, expected);
    assert_eq!(event.forge, Forge::GitLab);
    assert_eq!(event.repo_owner, "group");
    assert_eq!(event.repo_name, "tool");
    assert_eq!(event.mr_number, 10);
    assert_eq!(event.source_branch, "refactor");
}

#[parameterized(
    close = { "close" },
    merge = { "merge" },
    approved = { "approved" },
)]
fn gitlab_other_mr_actions_are_not_handled(action: &str) {
    let err = normalize_gitlab(&gitlab_mr_body(action), "familiar").unwrap_err();
    assert!(matches!(err, NormalizeError::NotHandled(_)));
}

#[test]
fn gitlab_mention_note_normalizes_with_position_and_thread() {
    let event =
        normalize_gitlab(&gitlab_note_body("@familiar please review", "MergeRequest"), "familiar")
            .unwrap();
    assert_eq!(event.kind, EventKind::Mention);
    // subgroups fold into the owner
    assert_eq!(event.repo_owner, "group/sub");
    assert_eq!(event.repo_name, "tool");
    assert_eq!(event.mr_number, 10);
    let comment = event.comment.unwrap();
    assert_eq!(comment.file_path.as_deref(), Some("src/main.rs"));
    assert_eq!(comment.line, Some(14));
    assert_eq!(comment.thread_id.as_deref(), Some("d1f2"));
}

#[test]
fn gitlab_plain_note_is_comment() {
    let event = normalize_gitlab(&gitlab_note_body("looks wrong", "MergeRequest"), "familiar")
        .unwrap();
    assert_eq!(event.kind, EventKind::MrComment);
}

#[test]
fn gitlab_non_mr_note_is_not_handled() {
    let err = normalize_gitlab(&gitlab_note_body("hi", "Issue"), "familiar").unwrap_err();
    assert!(matches!(err, NormalizeError::NotHandled(_)));
}

#[test]
fn gitlab_unknown_object_kind_is_not_handled() {
    let body = json!({
        "object_kind": "pipeline",
        "project": {"path_with_namespace": "g/t", "git_http_url": ""},
        "object_attributes": {}
    })
    .to_string();
    let err = normalize_gitlab(body.as_bytes(), "familiar").unwrap_err();
    assert!(matches!(err, NormalizeError::NotHandled(_)));
}

#[test]
fn timestamps_are_arrival_time() {
    let before = chrono::Utc::now();
    let event = normalize_gitlab(&gitlab_mr_body("open"), "familiar").unwrap();
    let after = chrono::Utc::now();
    assert!(event.received_at >= before && event.received_at <= after);
}
