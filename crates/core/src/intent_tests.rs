// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn requests_checks_membership() {
    let intent = ParsedIntent {
        instructions: "merge this".into(),
        requested_actions: vec![RequestedAction::Merge, RequestedAction::Push],
        confidence: 0.9,
        raw_text: "please merge".into(),
    };
    assert!(intent.requests(RequestedAction::Merge));
    assert!(intent.requests(RequestedAction::Push));
    assert!(!intent.requests(RequestedAction::Approve));
}

#[test]
fn blank_instructions_are_empty() {
    let intent = ParsedIntent {
        instructions: "  \n ".into(),
        requested_actions: Vec::new(),
        confidence: 0.1,
        raw_text: String::new(),
    };
    assert!(!intent.has_instructions());
}

#[test]
fn deserializes_from_model_json() {
    let json = r#"{
        "instructions": "run the tests and fix failures",
        "requested_actions": ["push", "dismiss_reviews"],
        "confidence": 0.75
    }"#;
    let intent: ParsedIntent = serde_json::from_str(json).unwrap();
    assert_eq!(intent.instructions, "run the tests and fix failures");
    assert_eq!(
        intent.requested_actions,
        vec![RequestedAction::Push, RequestedAction::DismissReviews]
    );
    assert!(intent.raw_text.is_empty());
}
