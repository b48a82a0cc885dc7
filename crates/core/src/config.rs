// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor configuration: a single immutable record built at command entry.

use std::path::PathBuf;

use thiserror::Error;

use crate::pidfile::WorkerKind;
use crate::slot::RetryPolicy;

/// Extra seconds added to the poll interval for the default reconciliation
/// timeouts.
pub const TIMEOUT_SLACK_SECS: u64 = 3;

/// Immutable supervisor configuration.
///
/// Built once per command invocation, validated with [`Config::validate`]
/// before anything touches the filesystem. Derived paths (lock directories,
/// stop file) default to locations under `pid_dir` but are independently
/// configurable.
#[derive(Debug, Clone)]
pub struct Config {
    /// Service name, used in status output and the init script.
    pub name: String,
    /// Directory holding pid files, and by default locks and the stop file.
    pub pid_dir: PathBuf,
    /// Number of main worker slots.
    pub max_procs: u32,
    /// Number of standby worker slots. Zero disables promotion.
    pub standby_max_procs: u32,
    /// Standby poll period in seconds.
    pub interval: u64,
    /// Seconds to poll after each kill signal before escalating.
    pub kill_timeout: u64,
    /// Seconds to wait for the main population during reconciliation.
    pub main_timeout: u64,
    /// Seconds to wait for the standby population during reconciliation.
    pub standby_timeout: u64,
    /// Directory of main slot locks (`<N>.lock`).
    pub lock_dir: PathBuf,
    /// Directory of standby slot locks (`<N>.lock`).
    pub standby_lock_dir: PathBuf,
    /// Stop-file sentinel path. Presence tells standbys to exit.
    pub stop_file: PathBuf,
    /// Retry policy for the standby promotion loop.
    pub retries: RetryPolicy,
    /// Run workers as this user (symbolic name).
    pub user: Option<String>,
    /// Run workers with this group (symbolic name).
    pub group: Option<String>,
    /// Worker umask.
    pub umask: Option<u32>,
    /// Worker working directory.
    pub directory: Option<PathBuf>,
    /// Worker stdout destination. `/dev/null` when unset.
    pub stdout_file: Option<PathBuf>,
    /// Worker stderr destination. `/dev/null` when unset.
    pub stderr_file: Option<PathBuf>,
    /// Suppress status lines on stdout.
    pub quiet: bool,
    /// Config file sourced by the emitted init script.
    pub init_config: Option<String>,
    /// Verbatim shell block included in the emitted init script.
    pub init_code: Option<String>,
    /// LSB Required-Start facilities.
    pub lsb_start: Option<String>,
    /// LSB Required-Stop facilities.
    pub lsb_stop: Option<String>,
    /// LSB Short-Description.
    pub lsb_sdesc: Option<String>,
    /// LSB Description.
    pub lsb_desc: Option<String>,
}

impl Config {
    /// Build a configuration with defaults derived from `name` and `pid_dir`.
    pub fn new(name: impl Into<String>, pid_dir: impl Into<PathBuf>) -> Self {
        let name = name.into();
        let pid_dir: PathBuf = pid_dir.into();
        let interval = 1;
        Self {
            lock_dir: pid_dir.join("lock"),
            standby_lock_dir: pid_dir.join("lock-standby"),
            stop_file: pid_dir.join("standby-stop-file"),
            name,
            pid_dir,
            max_procs: 1,
            standby_max_procs: 0,
            interval,
            kill_timeout: 1,
            main_timeout: interval + TIMEOUT_SLACK_SECS,
            standby_timeout: interval + TIMEOUT_SLACK_SECS,
            retries: RetryPolicy::Forever,
            user: None,
            group: None,
            umask: None,
            directory: None,
            stdout_file: None,
            stderr_file: None,
            quiet: false,
            init_config: None,
            init_code: None,
            lsb_start: None,
            lsb_stop: None,
            lsb_sdesc: None,
            lsb_desc: None,
        }
    }

    /// Validate the record. Called once at command entry; everything after
    /// may assume the invariants checked here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::MissingName);
        }
        if self.pid_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingPidDir);
        }
        if self.max_procs == 0 {
            return Err(ConfigError::InvalidLimiter(
                "max_procs must be at least 1".to_string(),
            ));
        }
        if self.interval == 0 {
            return Err(ConfigError::InvalidLimiter(
                "interval must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    /// Expected population for a worker kind.
    pub fn expected(&self, kind: WorkerKind) -> u32 {
        match kind {
            WorkerKind::Main => self.max_procs,
            WorkerKind::Standby => self.standby_max_procs,
            WorkerKind::Unknown => 0,
        }
    }

    /// Reconciliation timeout for a worker kind, in seconds.
    ///
    /// Both default to `interval + 3`; historically a single shared timeout.
    pub fn fork_timeout(&self, kind: WorkerKind) -> u64 {
        match kind {
            WorkerKind::Standby => self.standby_timeout,
            _ => self.main_timeout,
        }
    }
}

/// Configuration errors, fatal at command entry.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("name is required")]
    MissingName,

    #[error("pid_dir is required")]
    MissingPidDir,

    #[error("program is required")]
    MissingProgram,

    #[error("invalid concurrency limiter options: {0}")]
    InvalidLimiter(String),

    #[error("unsupported lock backend: {0} (only flock is supported)")]
    UnsupportedBackend(String),
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
