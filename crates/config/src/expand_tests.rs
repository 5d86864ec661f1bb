// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn substitutes_known_variable() {
    std::env::set_var("FAMILIAR_TEST_TOKEN", "tok123");
    let out = expand_env("token: ${FAMILIAR_TEST_TOKEN}");
    assert_eq!(out, "token: tok123");
    std::env::remove_var("FAMILIAR_TEST_TOKEN");
}

#[test]
#[serial]
fn missing_variable_becomes_empty() {
    std::env::remove_var("FAMILIAR_TEST_MISSING");
    let out = expand_env("secret: '${FAMILIAR_TEST_MISSING}'");
    assert_eq!(out, "secret: ''");
}

#[test]
fn ignores_non_reference_dollars() {
    let out = expand_env("price: $5 and ${not closed");
    assert_eq!(out, "price: $5 and ${not closed");
}

#[test]
#[serial]
fn substitutes_multiple_references() {
    std::env::set_var("FAMILIAR_TEST_A", "a");
    std::env::set_var("FAMILIAR_TEST_B", "b");
    let out = expand_env("${FAMILIAR_TEST_A}/${FAMILIAR_TEST_B}/${FAMILIAR_TEST_A}");
    assert_eq!(out, "a/b/a");
    std::env::remove_var("FAMILIAR_TEST_A");
    std::env::remove_var("FAMILIAR_TEST_B");
}
