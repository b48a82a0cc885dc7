// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness probes and the signal delivery policy.

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use thiserror::Error;
use tracing::warn;

/// Probe whether `pid` is running, via `kill(pid, 0)`.
///
/// EPERM means the process exists but belongs to someone else; it counts as
/// running, with a warning about insufficient privileges.
pub fn is_alive(pid: u32) -> Result<bool, ProcessError> {
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(Errno::EPERM) => {
            warn!(pid, "pid is running but not signalable (insufficient privileges)");
            Ok(true)
        }
        Err(errno) => Err(ProcessError::Probe(pid, errno)),
    }
}

/// Deliver `sig` to `pid`.
///
/// ESRCH is success: the process is already gone, which is what most callers
/// were after. EPERM is fatal and points at the privilege problem.
pub fn send_signal(pid: u32, sig: Signal) -> Result<(), ProcessError> {
    match kill(Pid::from_raw(pid as i32), sig) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(Errno::EPERM) => Err(ProcessError::NotPermitted(pid, sig)),
        Err(errno) => Err(ProcessError::Signal(pid, sig, errno)),
    }
}

/// Signal and probe failures.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("cannot probe pid {0}: {1}")]
    Probe(u32, Errno),

    #[error("not permitted to send {1} to pid {0} (needs root)")]
    NotPermitted(u32, Signal),

    #[error("failed to send {1} to pid {0}: {2}")]
    Signal(u32, Signal, Errno),
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
