// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::Path;
use std::sync::Arc;

use hadc_core::pidfile::PidFile;
use hadc_core::Config;
use serial_test::serial;
use tempfile::tempdir;

fn test_supervisor(pid_dir: &Path, max: u32, standby_max: u32) -> Supervisor {
    let mut config = Config::new("myapp", pid_dir);
    config.max_procs = max;
    config.standby_max_procs = standby_max;
    config.quiet = true;
    Supervisor::new(config, Arc::new(|_: &Supervisor, _: &[String]| 0)).unwrap()
}

#[test]
fn failure_statuses_paint_red() {
    assert!(apply_status("Not Running").starts_with(RED));
    assert!(apply_status("failed: timeout").starts_with(RED));
    assert!(apply_status("dead").starts_with(RED));
}

#[test]
fn healthy_and_unknown_statuses_paint_green() {
    assert!(apply_status("Running").starts_with(GREEN));
    // Unknown statuses default to green.
    assert!(apply_status("chartreuse").starts_with(GREEN));
}

#[test]
fn painted_text_resets_at_the_end() {
    assert!(apply_status("Running").ends_with(RESET));
}

#[test]
#[serial]
fn no_colors_env_suppresses_paint() {
    std::env::set_var("HADC_NO_COLORS", "1");
    assert_eq!(paint("Running"), "Running");
    std::env::remove_var("HADC_NO_COLORS");
}

#[test]
fn dump_is_true_only_when_all_slots_run() {
    let dir = tempdir().unwrap();
    let sup = test_supervisor(dir.path(), 2, 1);

    assert!(!dump(&sup).unwrap());

    let _m1 = PidFile::create(dir.path(), WorkerTag::main(1), std::process::id()).unwrap();
    let _m2 = PidFile::create(dir.path(), WorkerTag::main(2), std::process::id()).unwrap();
    assert!(!dump(&sup).unwrap());

    let _s1 = PidFile::create(dir.path(), WorkerTag::standby(1), std::process::id()).unwrap();
    assert!(dump(&sup).unwrap());
}
