// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[test]
fn github_accepts_correct_signature() {
    let body = br#"{"action":"opened"}"#;
    let header = sign("s3cret", body);
    assert!(verify_github_signature("s3cret", Some(&header), body));
}

#[test]
fn github_rejects_altered_body() {
    let body = br#"{"action":"opened"}"#;
    let header = sign("s3cret", body);
    let tampered = br#"{"action":"opened!"}"#;
    assert!(!verify_github_signature("s3cret", Some(&header), tampered));
}

#[test]
fn github_rejects_wrong_secret() {
    let body = b"payload";
    let header = sign("other", body);
    assert!(!verify_github_signature("s3cret", Some(&header), body));
}

#[test]
fn github_rejects_missing_or_malformed_header() {
    assert!(!verify_github_signature("s3cret", None, b"x"));
    assert!(!verify_github_signature("s3cret", Some("deadbeef"), b"x"));
    assert!(!verify_github_signature("s3cret", Some("sha256=nothex"), b"x"));
    assert!(!verify_github_signature("s3cret", Some("sha1=abcd"), b"x"));
}

#[test]
fn gitlab_accepts_exact_token() {
    assert!(verify_gitlab_token("tok", Some("tok")));
}

#[test]
fn gitlab_rejects_everything_else() {
    assert!(!verify_gitlab_token("tok", Some("TOK")));
    assert!(!verify_gitlab_token("tok", Some("tok2")));
    assert!(!verify_gitlab_token("tok", Some("")));
    assert!(!verify_gitlab_token("tok", None));
}
