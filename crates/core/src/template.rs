// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `[% KEY %]` template substitution.
//!
//! Deliberately trivial: no conditionals, no loops. Conditional content is
//! pre-rendered by the caller before substitution.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[%\s*([A-Z][A-Z0-9_]*)\s*%\]").expect("constant regex pattern is valid")
});

/// Substitute `[% KEY %]` placeholders with values from the map.
///
/// Unknown keys are left in place, which makes missing substitutions easy to
/// spot in the rendered output.
pub fn render(template: &str, vars: &HashMap<&str, String>) -> String {
    KEY_PATTERN
        .replace_all(template, |caps: &regex::Captures<'_>| {
            let key = &caps[1];
            match vars.get(key) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
