// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker lifecycle, run inside the detached grandchild.
//!
//! A worker announces itself with an `unknown-<pid>.pid` file before any
//! lock negotiation, so the supervisor always has evidence of it. From there
//! the slot allocator decides: main slot straight away, standby slot with a
//! promotion poll, or no slot at all.

use std::fs::File;
use std::os::fd::AsRawFd;
use std::path::Path;

use nix::sys::resource::{getrlimit, Resource};
use nix::sys::stat::{umask, Mode};
use nix::unistd::{chdir, close, dup2, setgid, setuid, Group, User};
use thiserror::Error;
use tracing::{debug, error, info};

use hadc_core::env::LOCK_FD_ENV;
use hadc_core::pidfile::{PidFile, WorkerTag};
use hadc_core::slot::{RetryDecision, SlotAllocator, SlotConfig};
use hadc_core::{Config, StopFile};

use crate::Supervisor;

/// Upper bound on the descriptor sweep; inherited descriptors sit far below.
const MAX_FD_SWEEP: u64 = 65536;

/// Worker body. The return value becomes the process exit code.
pub(crate) fn run(sup: &Supervisor) -> i32 {
    let config = sup.config();
    let stop = sup.stop_file();

    // Pre-payload guard: a stop file means this worker was never wanted.
    if stop.exists() {
        info!("stop file present, worker exiting");
        return 0;
    }

    if let Err(e) = apply_hygiene(config) {
        error!(error = %e, "worker hygiene failed");
        return 1;
    }

    let pid = std::process::id();
    let mut pidfile = match PidFile::create(&config.pid_dir, WorkerTag::unknown(pid), pid) {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "could not write pid file");
            return 1;
        }
    };

    let allocator = SlotAllocator::new(SlotConfig::from_config(config));
    let acquired = allocator.acquire(|attempt, standby_slot| {
        retry_hook(attempt, standby_slot, &mut pidfile, &stop)
    });

    let lock = match acquired {
        Ok(Some(lock)) => lock,
        Ok(None) => {
            // Either every slot was taken or the stop file cut the loop.
            return if stop.exists() {
                info!("stop file present, standby exiting");
                pidfile.unlink();
                0
            } else {
                info!("no slot available, worker exiting");
                pidfile.unlink();
                1
            };
        }
        Err(e) => {
            error!(error = %e, "lock acquisition failed");
            pidfile.unlink();
            return 1;
        }
    };

    if let Err(e) = pidfile.rename_to(WorkerTag::main(lock.slot())) {
        error!(error = %e, "could not publish main identity");
        return 1;
    }
    if let Err(e) = lock.clear_cloexec() {
        error!(error = %e, "could not make lock descriptor inheritable");
        return 1;
    }
    std::env::set_var(LOCK_FD_ENV, lock.raw_fd().to_string());

    // Last stop-file check before committing to the payload.
    if stop.exists() {
        info!("stop file present after promotion, exiting before payload");
        pidfile.unlink();
        return 0;
    }

    info!(slot = lock.slot(), pid, "entering payload");
    let code = (sup.payload())(sup, sup.user_args());
    debug!(slot = lock.slot(), code, "payload returned");

    pidfile.unlink();
    drop(lock);
    code
}

/// Per-attempt hook for the promotion loop.
///
/// Attempt 1 is the moment the standby identity becomes externally visible:
/// the pid file is renamed from `unknown-<pid>` to `standby-<slot>`. Every
/// attempt re-checks the stop file.
fn retry_hook(
    attempt: u32,
    standby_slot: u32,
    pidfile: &mut PidFile,
    stop: &StopFile,
) -> RetryDecision {
    if attempt == 1 {
        if let Err(e) = pidfile.rename_to(WorkerTag::standby(standby_slot)) {
            error!(error = %e, "could not publish standby identity");
            return RetryDecision::Stop;
        }
    }
    if stop.exists() {
        return RetryDecision::Stop;
    }
    RetryDecision::Continue
}

/// Process hygiene applied before any identity is published: umask, group
/// and user switch, working directory, descriptor cleanup, stdio rewiring.
fn apply_hygiene(config: &Config) -> Result<(), HygieneError> {
    if let Some(mask) = config.umask {
        umask(Mode::from_bits_truncate(mask));
    }

    if let Some(name) = &config.group {
        let group = Group::from_name(name)
            .map_err(|e| HygieneError::Lookup(name.clone(), e))?
            .ok_or_else(|| HygieneError::UnknownGroup(name.clone()))?;
        setgid(group.gid).map_err(|e| HygieneError::SetGid(name.clone(), e))?;
    }

    if let Some(name) = &config.user {
        let user = User::from_name(name)
            .map_err(|e| HygieneError::Lookup(name.clone(), e))?
            .ok_or_else(|| HygieneError::UnknownUser(name.clone()))?;
        setuid(user.uid).map_err(|e| HygieneError::SetUid(name.clone(), e))?;
        std::env::set_var("USER", &user.name);
        std::env::set_var("HOME", &user.dir);
    }

    if let Some(dir) = &config.directory {
        chdir(dir.as_path()).map_err(|e| HygieneError::Chdir(dir.display().to_string(), e))?;
    }

    close_inherited_fds();
    redirect_stdio(config)?;
    Ok(())
}

/// Close descriptors 3.. up to the soft NOFILE limit (bounded sweep).
fn close_inherited_fds() {
    let limit = getrlimit(Resource::RLIMIT_NOFILE)
        .map(|(soft, _hard)| soft)
        .unwrap_or(1024)
        .min(MAX_FD_SWEEP);
    for fd in 3..limit as i32 {
        let _ = close(fd);
    }
}

/// Rewire stdin to /dev/null and stdout/stderr to the configured files.
fn redirect_stdio(config: &Config) -> Result<(), HygieneError> {
    let stdin = File::open("/dev/null").map_err(HygieneError::Stdio)?;
    dup2(stdin.as_raw_fd(), 0).map_err(HygieneError::Dup)?;

    let stdout = open_sink(config.stdout_file.as_deref())?;
    dup2(stdout.as_raw_fd(), 1).map_err(HygieneError::Dup)?;

    let stderr = open_sink(config.stderr_file.as_deref())?;
    dup2(stderr.as_raw_fd(), 2).map_err(HygieneError::Dup)?;
    Ok(())
}

fn open_sink(path: Option<&Path>) -> Result<File, HygieneError> {
    let file = match path {
        Some(path) => std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path),
        None => std::fs::OpenOptions::new().write(true).open("/dev/null"),
    };
    file.map_err(HygieneError::Stdio)
}

#[derive(Debug, Error)]
enum HygieneError {
    #[error("user/group lookup for {0:?} failed: {1}")]
    Lookup(String, nix::errno::Errno),

    #[error("unknown user {0:?}")]
    UnknownUser(String),

    #[error("unknown group {0:?}")]
    UnknownGroup(String),

    #[error("setuid to {0:?} failed: {1}")]
    SetUid(String, nix::errno::Errno),

    #[error("setgid to {0:?} failed: {1}")]
    SetGid(String, nix::errno::Errno),

    #[error("chdir to {0} failed: {1}")]
    Chdir(String, nix::errno::Errno),

    #[error("stdio redirection failed: {0}")]
    Stdio(#[source] std::io::Error),

    #[error("dup2 failed: {0}")]
    Dup(nix::errno::Errno),
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
