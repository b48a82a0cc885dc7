// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! hadc - high-availability daemon control
//!
//! Per-invocation supervisor CLI: loads a TOML settings file, builds the
//! exec payload, and dispatches one control action.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod settings;

use std::ffi::CString;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use nix::unistd::execvp;
use tracing::error;

use hadc_supervisor::{Payload, Supervisor};

#[derive(Parser)]
#[command(
    name = "hadc",
    version,
    about = "High-availability daemon control: supervise N mains with hot standbys"
)]
struct Cli {
    /// Path to the TOML settings file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: PathBuf,

    /// Action: start, stop, restart, hard_restart, status, reload, fork,
    /// get_init_file (leading dashes are tolerated)
    #[arg(value_name = "ACTION", allow_hyphen_values = true)]
    action: String,

    /// Extra arguments forwarded to the worker payload
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            let msg = format_error(&e);
            if !msg.is_empty() {
                eprintln!("Error: {}", msg);
            }
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let loaded = settings::load(&cli.config)?;

    let payload = exec_payload(loaded.program, loaded.program_args);
    let script = init_script_line(&cli.config);
    let supervisor = Supervisor::new(loaded.config, payload)?
        .with_user_args(cli.args)
        .with_script(script);

    Ok(supervisor.run_action(&cli.action)?)
}

/// The stock payload: replace the worker with the configured program.
///
/// `HADC_lock_fd` is already in the environment, so the program keeps the
/// main slot for as long as it lives (and across its own re-execs).
fn exec_payload(program: String, program_args: Vec<String>) -> Payload {
    Arc::new(move |_sup: &Supervisor, user_args: &[String]| {
        let argv = match build_argv(&program, &program_args, user_args) {
            Some(argv) => argv,
            None => {
                error!(program = %program, "program or argument contains a NUL byte");
                return 1;
            }
        };
        match execvp(&argv[0], &argv) {
            Ok(infallible) => match infallible {},
            Err(errno) => {
                error!(program = %program, error = %errno, "exec failed");
                127
            }
        }
    })
}

/// Assemble the exec argv: program name, configured args, pass-through args.
fn build_argv(program: &str, program_args: &[String], user_args: &[String]) -> Option<Vec<CString>> {
    let mut argv = vec![CString::new(program).ok()?];
    for arg in program_args.iter().chain(user_args) {
        argv.push(CString::new(arg.as_str()).ok()?);
    }
    Some(argv)
}

/// Invocation line for the emitted init script.
fn init_script_line(config_path: &std::path::Path) -> String {
    let exe = std::env::current_exe()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "hadc".to_string());
    format!("{} --config {}", exe, config_path.display())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if hadc_core::env::trace_enabled() {
        EnvFilter::new("trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Format an anyhow error, deduplicating the chain.
///
/// If the top-level Display already contains the source error text, we skip
/// the "Caused by" chain to avoid noisy duplicate output (common when
/// thiserror variants use `#[error("... {0}")]` with `#[from]`).
/// Otherwise we render the full chain so context isn't lost.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();

    // Walk the source chain; if every source message already appears
    // in the top-level string, the chain is redundant.
    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));

    if chain_redundant {
        return top;
    }

    // Non-redundant chain — render like anyhow's Debug.
    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
