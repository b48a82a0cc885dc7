// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use anyhow::anyhow;

#[test]
fn cli_accepts_dashed_action_tokens() {
    let cli = Cli::try_parse_from(["hadc", "-c", "hadc.toml", "--stop"]).unwrap();
    assert_eq!(cli.action, "--stop");

    let cli = Cli::try_parse_from(["hadc", "--config", "hadc.toml", "status"]).unwrap();
    assert_eq!(cli.action, "status");
}

#[test]
fn cli_collects_trailing_payload_args() {
    let cli = Cli::try_parse_from(["hadc", "-c", "hadc.toml", "start", "--verbose", "extra"])
        .unwrap();
    assert_eq!(cli.action, "start");
    assert_eq!(cli.args, vec!["--verbose", "extra"]);
}

#[test]
fn cli_requires_a_config_file() {
    assert!(Cli::try_parse_from(["hadc", "start"]).is_err());
}

#[test]
fn build_argv_orders_program_then_args() {
    let argv = build_argv(
        "/usr/bin/worker",
        &["--port".to_string(), "8080".to_string()],
        &["extra".to_string()],
    )
    .unwrap();

    let rendered: Vec<_> = argv.iter().map(|c| c.to_str().unwrap()).collect();
    assert_eq!(rendered, vec!["/usr/bin/worker", "--port", "8080", "extra"]);
}

#[test]
fn build_argv_rejects_nul_bytes() {
    assert!(build_argv("bad\0program", &[], &[]).is_none());
    assert!(build_argv("ok", &["bad\0arg".to_string()], &[]).is_none());
}

#[test]
fn format_error_dedupes_redundant_chains() {
    let inner = anyhow!("disk full");
    let outer = inner.context("failed to write pid file: disk full");

    let msg = format_error(&outer);
    assert_eq!(msg, "failed to write pid file: disk full");
}

#[test]
fn format_error_keeps_informative_chains() {
    let inner = anyhow!("disk full");
    let outer = inner.context("could not start");

    let msg = format_error(&outer);
    assert!(msg.contains("could not start"));
    assert!(msg.contains("Caused by"));
    assert!(msg.contains("disk full"));
}
