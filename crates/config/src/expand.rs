// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `${NAME}` environment substitution for config documents.

use regex::Regex;
use std::sync::LazyLock;

/// Regex pattern for ${VAR_NAME} references in the raw YAML text
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static ENV_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("constant regex pattern is valid")
});

/// Replace every `${NAME}` with the value of the environment variable
/// `NAME`. Missing variables substitute to empty string.
pub fn expand_env(raw: &str) -> String {
    ENV_REF
        .replace_all(raw, |caps: &regex::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

#[cfg(test)]
#[path = "expand_tests.rs"]
mod tests;
