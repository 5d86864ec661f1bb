// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use familiar_core::RequestedAction;

#[test]
fn decodes_plain_json_payload() {
    let payload = r#"{"instructions": "merge once CI is green", "requested_actions": ["merge"], "confidence": 0.92}"#;
    let intent = decode_intent(payload, "@familiar merge this when CI passes").unwrap();
    assert_eq!(intent.instructions, "merge once CI is green");
    assert_eq!(intent.requested_actions, vec![RequestedAction::Merge]);
    assert!((intent.confidence - 0.92).abs() < f64::EPSILON);
    assert_eq!(intent.raw_text, "@familiar merge this when CI passes");
}

#[test]
fn decodes_fenced_payload() {
    let payload = "```json\n{\"instructions\": \"fix the test\", \"requested_actions\": [], \"confidence\": 0.5}\n```";
    let intent = decode_intent(payload, "raw").unwrap();
    assert_eq!(intent.instructions, "fix the test");
    assert!(intent.requested_actions.is_empty());
}

#[test]
fn rejects_non_json_payload() {
    let err = decode_intent("I would merge this.", "raw").unwrap_err();
    assert!(matches!(err, ParseIntentError::Decode(_)));
}

#[test]
fn missing_actions_default_to_empty() {
    let payload = r#"{"instructions": "look at the failing test", "confidence": 0.4}"#;
    let intent = decode_intent(payload, "raw").unwrap();
    assert!(intent.requested_actions.is_empty());
}

#[test]
fn strip_code_fence_passthrough() {
    assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
}
