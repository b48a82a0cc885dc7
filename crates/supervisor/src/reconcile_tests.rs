// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::Path;
use std::sync::Arc;

use hadc_core::pidfile::PidFile;
use hadc_core::Config;
use tempfile::tempdir;

fn test_supervisor(pid_dir: &Path, max: u32, standby_max: u32) -> Supervisor {
    let mut config = Config::new("myapp", pid_dir);
    config.max_procs = max;
    config.standby_max_procs = standby_max;
    config.quiet = true;
    Supervisor::new(config, Arc::new(|_: &Supervisor, _: &[String]| 0)).unwrap()
}

fn dead_pid() -> u32 {
    let mut child = std::process::Command::new("true").spawn().unwrap();
    let pid = child.id();
    child.wait().unwrap();
    pid
}

#[test]
fn running_count_sees_only_live_pids() {
    let dir = tempdir().unwrap();
    let sup = test_supervisor(dir.path(), 3, 0);

    // Slot 1: live. Slot 2: stale. Slot 3: absent.
    let _live = PidFile::create(dir.path(), WorkerTag::main(1), std::process::id()).unwrap();
    let _stale = PidFile::create(dir.path(), WorkerTag::main(2), dead_pid()).unwrap();

    assert_eq!(running_count(&sup, WorkerKind::Main).unwrap(), 1);
    assert_eq!(running_count(&sup, WorkerKind::Standby).unwrap(), 0);
}

#[test]
fn running_count_ignores_slots_beyond_expected() {
    let dir = tempdir().unwrap();
    let sup = test_supervisor(dir.path(), 1, 0);

    let _in_range = PidFile::create(dir.path(), WorkerTag::main(1), std::process::id()).unwrap();
    let _beyond = PidFile::create(dir.path(), WorkerTag::main(2), std::process::id()).unwrap();

    assert_eq!(running_count(&sup, WorkerKind::Main).unwrap(), 1);
}

#[test]
fn wait_for_population_returns_immediately_when_met() {
    let dir = tempdir().unwrap();
    let sup = test_supervisor(dir.path(), 1, 0);

    assert!(wait_for_population(&sup, WorkerKind::Main, 0, 10).unwrap());
}

#[test]
fn wait_for_population_times_out_on_deficit() {
    let dir = tempdir().unwrap();
    let sup = test_supervisor(dir.path(), 1, 0);

    assert!(!wait_for_population(&sup, WorkerKind::Main, 1, 0).unwrap());
}

#[test]
fn fork_until_with_zero_expected_is_trivially_done() {
    let dir = tempdir().unwrap();
    let sup = test_supervisor(dir.path(), 1, 0);

    assert!(fork_until(&sup, WorkerKind::Standby).unwrap());
}

#[test]
fn restart_main_with_no_worker_is_success() {
    let dir = tempdir().unwrap();
    let sup = test_supervisor(dir.path(), 1, 1);

    assert!(restart_main(&sup, 1).unwrap());
}

#[test]
fn restart_main_treats_stale_pid_as_absent() {
    let dir = tempdir().unwrap();
    let sup = test_supervisor(dir.path(), 1, 1);
    let _stale = PidFile::create(dir.path(), WorkerTag::main(1), dead_pid()).unwrap();

    assert!(restart_main(&sup, 1).unwrap());
}

#[test]
fn stop_mains_sweeps_stale_pid_files() {
    let dir = tempdir().unwrap();
    let sup = test_supervisor(dir.path(), 2, 0);

    let stale = PidFile::create(dir.path(), WorkerTag::main(1), dead_pid()).unwrap();
    let path = stale.path();
    std::mem::forget(stale); // leave the file on disk for the sweep

    assert!(stop_mains(&sup).unwrap());
    assert!(!path.exists());
}

#[test]
fn warn_stolen_locks_is_quiet_when_populations_match() {
    let dir = tempdir().unwrap();
    let sup = test_supervisor(dir.path(), 1, 0);
    let _live = PidFile::create(dir.path(), WorkerTag::main(1), std::process::id()).unwrap();

    warn_stolen_locks(&sup).unwrap();
}

#[test]
fn escalation_ends_with_sigkill() {
    assert_eq!(ESCALATION.first(), Some(&Signal::SIGTERM));
    assert_eq!(ESCALATION.last(), Some(&Signal::SIGKILL));
    assert_eq!(ESCALATION.len(), 4);
}
