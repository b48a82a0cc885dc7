// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pid file registry: `<pid_dir>/<kind>-<id>.pid` naming, atomic renames,
//! liveness-filtered reads.
//!
//! Workers own their pid file and rename it in place as their lock identity
//! changes; the supervisor only ever reads. A pid file whose PID is no longer
//! running is treated as absent.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::process::{self, ProcessError};

/// Worker identity kind as encoded in pid file names.
///
/// `Unknown` is the transient state between fork and the first lock
/// acquisition; its id is the worker's own PID rather than a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerKind {
    Unknown,
    Standby,
    Main,
}

impl WorkerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerKind::Unknown => "unknown",
            WorkerKind::Standby => "standby",
            WorkerKind::Main => "main",
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A worker identity: kind plus slot id (or PID for `Unknown`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerTag {
    pub kind: WorkerKind,
    pub id: u32,
}

impl WorkerTag {
    pub fn new(kind: WorkerKind, id: u32) -> Self {
        Self { kind, id }
    }

    pub fn main(slot: u32) -> Self {
        Self::new(WorkerKind::Main, slot)
    }

    pub fn standby(slot: u32) -> Self {
        Self::new(WorkerKind::Standby, slot)
    }

    pub fn unknown(pid: u32) -> Self {
        Self::new(WorkerKind::Unknown, pid)
    }

    /// Pid file basename, e.g. `main-1.pid`.
    pub fn file_name(&self) -> String {
        format!("{}-{}.pid", self.kind, self.id)
    }

    /// Full pid file path under `pid_dir`.
    pub fn path(&self, pid_dir: &Path) -> PathBuf {
        pid_dir.join(self.file_name())
    }

    /// Human label for status output, e.g. `main #1`.
    pub fn label(&self) -> String {
        format!("{} #{}", self.kind, self.id)
    }
}

impl fmt::Display for WorkerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind, self.id)
    }
}

/// A worker's own pid file.
///
/// Created once at worker entry, renamed on each lock transition, unlinked on
/// exit. The `Drop` impl is a best-effort backstop for early error returns;
/// normal exit paths call [`PidFile::unlink`] explicitly.
#[derive(Debug)]
pub struct PidFile {
    pid_dir: PathBuf,
    tag: WorkerTag,
    unlinked: bool,
}

impl PidFile {
    /// Create (or truncate) the pid file for `tag`, writing `pid` as decimal.
    pub fn create(pid_dir: &Path, tag: WorkerTag, pid: u32) -> Result<Self, PidFileError> {
        let path = tag.path(pid_dir);
        std::fs::write(&path, format!("{pid}\n"))
            .map_err(|e| PidFileError::Write(path.clone(), e))?;
        debug!(path = %path.display(), pid, "wrote pid file");
        Ok(Self {
            pid_dir: pid_dir.to_path_buf(),
            tag,
            unlinked: false,
        })
    }

    pub fn tag(&self) -> WorkerTag {
        self.tag
    }

    pub fn path(&self) -> PathBuf {
        self.tag.path(&self.pid_dir)
    }

    /// Atomically rename the pid file to reflect a new identity.
    pub fn rename_to(&mut self, tag: WorkerTag) -> Result<(), PidFileError> {
        let old = self.tag.path(&self.pid_dir);
        let new = tag.path(&self.pid_dir);
        std::fs::rename(&old, &new).map_err(|e| PidFileError::Rename(old.clone(), new, e))?;
        debug!(from = %self.tag, to = %tag, "renamed pid file");
        self.tag = tag;
        Ok(())
    }

    /// Remove the pid file. No-op when already gone.
    pub fn unlink(mut self) {
        self.unlink_inner();
    }

    fn unlink_inner(&mut self) {
        if !self.unlinked {
            unlink_if_present(&self.tag.path(&self.pid_dir));
            self.unlinked = true;
        }
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        self.unlink_inner();
    }
}

/// Remove a file, ignoring absence.
pub fn unlink_if_present(path: &Path) {
    if path.exists() {
        let _ = std::fs::remove_file(path);
    }
}

/// Read the PID recorded for `tag`, without a liveness check.
///
/// Absent file means no pid; unparsable contents are reported as an error.
pub fn read_pid(pid_dir: &Path, tag: &WorkerTag) -> Result<Option<u32>, PidFileError> {
    let path = tag.path(pid_dir);
    let contents = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PidFileError::Read(path, e)),
    };
    contents
        .trim()
        .parse::<u32>()
        .map(Some)
        .map_err(|_| PidFileError::Malformed(path, contents.trim().to_string()))
}

/// Read the PID recorded for `tag`, filtered by liveness.
///
/// Absent, malformed, or dead entries all come back as `None`; only probe
/// failures other than ESRCH/EPERM propagate.
pub fn live_pid(pid_dir: &Path, tag: &WorkerTag) -> Result<Option<u32>, PidFileError> {
    let pid = match read_pid(pid_dir, tag) {
        Ok(Some(pid)) => pid,
        Ok(None) | Err(PidFileError::Malformed(..)) => return Ok(None),
        Err(e) => return Err(e),
    };
    if process::is_alive(pid)? {
        Ok(Some(pid))
    } else {
        Ok(None)
    }
}

/// Pid registry errors.
#[derive(Debug, Error)]
pub enum PidFileError {
    #[error("failed to write pid file {0}: {1}")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("failed to read pid file {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("failed to rename pid file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, #[source] std::io::Error),

    #[error("pid file {0} does not contain a pid: {1:?}")]
    Malformed(PathBuf, String),

    #[error(transparent)]
    Probe(#[from] ProcessError),
}

#[cfg(test)]
#[path = "pidfile_tests.rs"]
mod tests;
