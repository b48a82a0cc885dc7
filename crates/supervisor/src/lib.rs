// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hadc-supervisor: the supervision engine.
//!
//! One [`Supervisor`] per command invocation. The supervisor spawns detached
//! workers via double fork, reads the pid registry to observe the running
//! population, and reconciles it against the expected population. Workers
//! negotiate their own identity through the slot allocator and report it
//! back by renaming their pid file.

pub mod commands;
pub mod init_script;
pub mod reconcile;
pub mod status;
mod worker;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use hadc_core::{Config, ConfigError, PidFileError, ProcessError, StopFile};

/// Worker payload: invoked in the worker once a main slot is held.
///
/// Receives the supervisor handle and the pass-through user arguments;
/// its return value becomes the worker's exit code. A payload is free to
/// re-exec itself: the main lock descriptor rides along in `HADC_lock_fd`.
pub type Payload = Arc<dyn Fn(&Supervisor, &[String]) -> i32 + Send + Sync>;

/// The supervisor handle: immutable configuration plus the payload.
pub struct Supervisor {
    config: Config,
    payload: Payload,
    user_args: Vec<String>,
    script: Option<String>,
}

impl Supervisor {
    /// Build a supervisor, validating the configuration up front.
    pub fn new(config: Config, payload: Payload) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            payload,
            user_args: Vec::new(),
            script: None,
        })
    }

    /// Arguments forwarded verbatim to the payload.
    pub fn with_user_args(mut self, args: Vec<String>) -> Self {
        self.user_args = args;
        self
    }

    /// Invocation line baked into the emitted init script.
    ///
    /// Defaults to the current executable path.
    pub fn with_script(mut self, script: String) -> Self {
        self.script = Some(script);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn user_args(&self) -> &[String] {
        &self.user_args
    }

    pub(crate) fn payload(&self) -> &(dyn Fn(&Supervisor, &[String]) -> i32 + Send + Sync) {
        self.payload.as_ref()
    }

    pub(crate) fn script(&self) -> String {
        match &self.script {
            Some(script) => script.clone(),
            None => std::env::current_exe()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| self.config.name.clone()),
        }
    }

    /// Stop-file sentinel for this configuration.
    pub fn stop_file(&self) -> StopFile {
        StopFile::new(&self.config.stop_file)
    }

    /// Dispatch one action token and return the process exit code.
    pub fn run_action(&self, action: &str) -> Result<i32, CommandError> {
        commands::dispatch(self, action)
    }
}

/// Failure to spawn a detached worker.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("fork failed: {0}")]
    Fork(nix::errno::Errno),

    #[error("waitpid on intermediate child failed: {0}")]
    Wait(nix::errno::Errno),
}

/// Command-level errors. All of these are fatal to the invocation.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown action {given:?}; valid actions: {valid}")]
    UnknownAction { given: String, valid: String },

    #[error("failed to create pid directory {0}: {1}")]
    PidDir(PathBuf, #[source] std::io::Error),

    #[error("failed to update stop file {0}: {1}")]
    StopFile(PathBuf, #[source] std::io::Error),

    #[error(transparent)]
    Pid(#[from] PidFileError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Spawn(#[from] SpawnError),
}
