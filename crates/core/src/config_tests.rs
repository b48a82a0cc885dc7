// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::Path;

#[test]
fn defaults_derive_paths_from_pid_dir() {
    let config = Config::new("myapp", "/var/run/myapp");

    assert_eq!(config.lock_dir, Path::new("/var/run/myapp/lock"));
    assert_eq!(
        config.standby_lock_dir,
        Path::new("/var/run/myapp/lock-standby")
    );
    assert_eq!(
        config.stop_file,
        Path::new("/var/run/myapp/standby-stop-file")
    );
}

#[test]
fn default_timeouts_are_interval_plus_slack() {
    let config = Config::new("myapp", "/tmp/myapp");

    assert_eq!(config.main_timeout, config.interval + TIMEOUT_SLACK_SECS);
    assert_eq!(config.standby_timeout, config.interval + TIMEOUT_SLACK_SECS);
}

#[test]
fn validate_accepts_defaults() {
    let config = Config::new("myapp", "/tmp/myapp");
    assert!(config.validate().is_ok());
}

#[test]
fn validate_rejects_empty_name() {
    let config = Config::new("", "/tmp/myapp");
    assert!(matches!(config.validate(), Err(ConfigError::MissingName)));
}

#[test]
fn validate_rejects_empty_pid_dir() {
    let config = Config::new("myapp", "");
    assert!(matches!(config.validate(), Err(ConfigError::MissingPidDir)));
}

#[test]
fn validate_rejects_zero_max_procs() {
    let mut config = Config::new("myapp", "/tmp/myapp");
    config.max_procs = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidLimiter(_))
    ));
}

#[test]
fn expected_population_by_kind() {
    let mut config = Config::new("myapp", "/tmp/myapp");
    config.max_procs = 2;
    config.standby_max_procs = 1;

    assert_eq!(config.expected(WorkerKind::Main), 2);
    assert_eq!(config.expected(WorkerKind::Standby), 1);
    assert_eq!(config.expected(WorkerKind::Unknown), 0);
}

#[test]
fn fork_timeout_distinguishes_kinds() {
    let mut config = Config::new("myapp", "/tmp/myapp");
    config.main_timeout = 10;
    config.standby_timeout = 20;

    assert_eq!(config.fork_timeout(WorkerKind::Main), 10);
    assert_eq!(config.fork_timeout(WorkerKind::Standby), 20);
}
