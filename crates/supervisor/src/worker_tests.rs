// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hadc_core::pidfile;
use std::os::unix::fs::FileTypeExt;
use tempfile::tempdir;

#[test]
fn hook_publishes_standby_identity_on_first_attempt() {
    let dir = tempdir().unwrap();
    let stop = StopFile::new(dir.path().join("standby-stop-file"));
    let mut pidfile = PidFile::create(dir.path(), WorkerTag::unknown(42), 42).unwrap();

    let decision = retry_hook(1, 3, &mut pidfile, &stop);

    assert_eq!(decision, RetryDecision::Continue);
    assert_eq!(pidfile.tag(), WorkerTag::standby(3));
    assert_eq!(
        pidfile::read_pid(dir.path(), &WorkerTag::standby(3)).unwrap(),
        Some(42)
    );
    assert!(!WorkerTag::unknown(42).path(dir.path()).exists());
}

#[test]
fn hook_renames_only_once() {
    let dir = tempdir().unwrap();
    let stop = StopFile::new(dir.path().join("standby-stop-file"));
    let mut pidfile = PidFile::create(dir.path(), WorkerTag::unknown(42), 42).unwrap();

    assert_eq!(retry_hook(1, 3, &mut pidfile, &stop), RetryDecision::Continue);
    assert_eq!(retry_hook(2, 3, &mut pidfile, &stop), RetryDecision::Continue);
    assert_eq!(pidfile.tag(), WorkerTag::standby(3));
}

#[test]
fn hook_stops_when_stop_file_appears() {
    let dir = tempdir().unwrap();
    let stop = StopFile::new(dir.path().join("standby-stop-file"));
    let mut pidfile = PidFile::create(dir.path(), WorkerTag::unknown(42), 42).unwrap();

    assert_eq!(retry_hook(1, 1, &mut pidfile, &stop), RetryDecision::Continue);
    stop.create().unwrap();
    assert_eq!(retry_hook(2, 1, &mut pidfile, &stop), RetryDecision::Stop);
}

#[test]
fn hook_stops_on_first_attempt_under_stop_file() {
    let dir = tempdir().unwrap();
    let stop = StopFile::new(dir.path().join("standby-stop-file"));
    stop.create().unwrap();
    let mut pidfile = PidFile::create(dir.path(), WorkerTag::unknown(7), 7).unwrap();

    // The standby identity is still published before the stop check; the
    // worker unlinks it on its way out.
    assert_eq!(retry_hook(1, 1, &mut pidfile, &stop), RetryDecision::Stop);
    assert_eq!(pidfile.tag(), WorkerTag::standby(1));
}

#[test]
fn open_sink_defaults_to_dev_null() {
    let sink = open_sink(None).unwrap();
    assert!(sink.metadata().unwrap().file_type().is_char_device());
}

#[test]
fn open_sink_appends_to_configured_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.log");
    std::fs::write(&path, "existing\n").unwrap();

    {
        use std::io::Write;
        let mut sink = open_sink(Some(&path)).unwrap();
        sink.write_all(b"appended\n").unwrap();
    }

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "existing\nappended\n");
}
