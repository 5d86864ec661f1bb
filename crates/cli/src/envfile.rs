// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal KEY=VALUE env file loading for `--env-file`.
//!
//! Variables land in the process environment before the YAML config is
//! parsed, so its `${NAME}` references resolve against them.

use std::path::Path;

pub fn load(path: &Path) -> std::io::Result<()> {
    let raw = std::fs::read_to_string(path)?;
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        std::env::set_var(key, unquote(value.trim()));
    }
    Ok(())
}

fn unquote(value: &str) -> &str {
    let stripped = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')));
    stripped.unwrap_or(value)
}

#[cfg(test)]
#[path = "envfile_tests.rs"]
mod tests;
