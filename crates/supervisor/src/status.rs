// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status lines: `"<name>: <label>  [<status>]"` with optional ANSI color.

use std::io::IsTerminal;

use hadc_core::env;
use hadc_core::pidfile::{self, WorkerKind, WorkerTag};

use crate::{CommandError, Supervisor};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Determine if color output should be enabled.
///
/// `HADC_NO_COLORS` disables unconditionally; otherwise color follows the
/// TTY check.
pub fn should_colorize() -> bool {
    if env::no_colors() {
        return false;
    }
    std::io::stdout().is_terminal()
}

/// Colorize a status string based on its semantic meaning.
///
/// Red for failure states, green for everything else; unknown statuses
/// default to healthy green. First-word matching so compound statuses like
/// "Not Running" color correctly.
pub fn paint(text: &str) -> String {
    if !should_colorize() {
        return text.to_string();
    }
    apply_status(text)
}

/// Apply status color unconditionally (caller decides whether to use this).
pub(crate) fn apply_status(text: &str) -> String {
    let lower = text.trim_start().to_lowercase();
    let first_word = lower
        .split(|c: char| !c.is_alphabetic())
        .next()
        .unwrap_or("");
    let code = match first_word {
        "not" | "failed" | "dead" | "error" => RED,
        _ => GREEN,
    };
    format!("{code}{text}{RESET}")
}

/// Print one status line unless the configuration says to be quiet.
pub fn pretty_line(sup: &Supervisor, label: &str, status: &str) {
    if sup.config().quiet {
        return;
    }
    println!("{}: {}  [{}]", sup.config().name, label, paint(status));
}

/// Report every expected slot; returns whether all of them are running.
pub fn dump(sup: &Supervisor) -> Result<bool, CommandError> {
    let config = sup.config();
    let mut all_running = true;

    for kind in [WorkerKind::Main, WorkerKind::Standby] {
        for slot in 1..=config.expected(kind) {
            let tag = WorkerTag::new(kind, slot);
            let running = pidfile::live_pid(&config.pid_dir, &tag)?.is_some();
            if !running {
                all_running = false;
            }
            let status = if running { "Running" } else { "Not Running" };
            pretty_line(sup, &tag.label(), status);
        }
    }
    Ok(all_running)
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
