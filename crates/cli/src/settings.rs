// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TOML settings file, mapped onto the core configuration record.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use hadc_core::config::TIMEOUT_SLACK_SECS;
use hadc_core::slot::RetryPolicy;
use hadc_core::{Config, ConfigError};

/// On-disk settings. Everything except `name`, `pid_dir` and `program` is
/// optional; defaults come from [`Config::new`].
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub name: Option<String>,
    pub pid_dir: Option<PathBuf>,
    /// Program exec'd by the stock payload once a main slot is held.
    pub program: Option<String>,
    #[serde(default)]
    pub program_args: Vec<String>,
    pub max_procs: Option<u32>,
    pub standby_max_procs: Option<u32>,
    pub interval: Option<u64>,
    pub kill_timeout: Option<u64>,
    pub main_timeout: Option<u64>,
    pub standby_timeout: Option<u64>,
    /// Standby retry budget; absent means retry forever.
    pub retries: Option<u32>,
    /// Lock backend selector; only `flock` exists.
    pub lock_backend: Option<String>,
    pub lock_dir: Option<PathBuf>,
    pub standby_lock_dir: Option<PathBuf>,
    pub stop_file: Option<PathBuf>,
    pub user: Option<String>,
    pub group: Option<String>,
    /// Octal digits, e.g. `"027"`.
    pub umask: Option<String>,
    pub directory: Option<PathBuf>,
    pub stdout_file: Option<PathBuf>,
    pub stderr_file: Option<PathBuf>,
    pub quiet: Option<bool>,
    pub init_config: Option<String>,
    pub init_code: Option<String>,
    pub lsb_start: Option<String>,
    pub lsb_stop: Option<String>,
    pub lsb_sdesc: Option<String>,
    pub lsb_desc: Option<String>,
}

/// A validated configuration plus the exec-payload description.
#[derive(Debug)]
pub struct Loaded {
    pub config: Config,
    pub program: String,
    pub program_args: Vec<String>,
}

/// Read and validate a settings file.
pub fn load(path: &Path) -> Result<Loaded, SettingsError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| SettingsError::Read(path.to_path_buf(), e))?;
    let settings: Settings =
        toml::from_str(&contents).map_err(|e| SettingsError::Parse(path.to_path_buf(), e))?;
    settings.into_loaded()
}

impl Settings {
    /// Fold the settings into a validated [`Config`].
    pub fn into_loaded(self) -> Result<Loaded, SettingsError> {
        let name = self.name.ok_or(ConfigError::MissingName)?;
        let pid_dir = self.pid_dir.ok_or(ConfigError::MissingPidDir)?;
        let program = self.program.ok_or(ConfigError::MissingProgram)?;
        if let Some(backend) = self.lock_backend {
            if backend != "flock" {
                return Err(ConfigError::UnsupportedBackend(backend).into());
            }
        }

        let mut config = Config::new(name, pid_dir);
        if let Some(v) = self.max_procs {
            config.max_procs = v;
        }
        if let Some(v) = self.standby_max_procs {
            config.standby_max_procs = v;
        }
        if let Some(v) = self.interval {
            // Re-derive the timeout defaults; explicit values below win.
            config.interval = v;
            config.main_timeout = v + TIMEOUT_SLACK_SECS;
            config.standby_timeout = v + TIMEOUT_SLACK_SECS;
        }
        if let Some(v) = self.kill_timeout {
            config.kill_timeout = v;
        }
        if let Some(v) = self.main_timeout {
            config.main_timeout = v;
        }
        if let Some(v) = self.standby_timeout {
            config.standby_timeout = v;
        }
        if let Some(n) = self.retries {
            config.retries = RetryPolicy::Count(n);
        }
        if let Some(v) = self.lock_dir {
            config.lock_dir = v;
        }
        if let Some(v) = self.standby_lock_dir {
            config.standby_lock_dir = v;
        }
        if let Some(v) = self.stop_file {
            config.stop_file = v;
        }
        if let Some(v) = self.umask {
            let mask = u32::from_str_radix(&v, 8)
                .map_err(|_| SettingsError::InvalidUmask(v.clone()))?;
            config.umask = Some(mask);
        }
        config.user = self.user;
        config.group = self.group;
        config.directory = self.directory;
        config.stdout_file = self.stdout_file;
        config.stderr_file = self.stderr_file;
        config.quiet = self.quiet.unwrap_or(false);
        config.init_config = self.init_config;
        config.init_code = self.init_code;
        config.lsb_start = self.lsb_start;
        config.lsb_stop = self.lsb_stop;
        config.lsb_sdesc = self.lsb_sdesc;
        config.lsb_desc = self.lsb_desc;

        config.validate()?;
        Ok(Loaded {
            config,
            program,
            program_args: self.program_args,
        })
    }
}

/// Settings loading errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("failed to parse settings file {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("invalid umask {0:?} (expected octal digits)")]
    InvalidUmask(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
