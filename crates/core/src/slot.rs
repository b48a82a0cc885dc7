// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slot allocator: a two-level concurrency limiter over advisory file locks.
//!
//! Main slots `1..=max_slots` and standby slots `1..=standby_max_slots` each
//! map to one lock file. Acquisition is always non-blocking; a worker that
//! cannot get a main slot camps on a standby slot and polls for promotion.

use std::fs::File;
use std::os::fd::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fs2::FileExt;
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::Config;

/// Decision returned by the per-attempt hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Continue,
    Stop,
}

/// Standby retry policy.
///
/// A count `N` means the retry predicate holds for attempts `1..=N`. The
/// default retries forever; standbys are long-lived and exit through the
/// stop file, not through retry exhaustion.
#[derive(Clone)]
pub enum RetryPolicy {
    Forever,
    Count(u32),
    Predicate(Arc<dyn Fn(u32) -> bool + Send + Sync>),
}

impl RetryPolicy {
    /// Whether attempt number `attempt` (1-based) may proceed.
    pub fn allows(&self, attempt: u32) -> bool {
        match self {
            RetryPolicy::Forever => true,
            RetryPolicy::Count(n) => attempt <= *n,
            RetryPolicy::Predicate(p) => p(attempt),
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryPolicy::Forever => write!(f, "Forever"),
            RetryPolicy::Count(n) => write!(f, "Count({n})"),
            RetryPolicy::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

/// Allocator configuration.
#[derive(Debug, Clone)]
pub struct SlotConfig {
    pub max_slots: u32,
    pub standby_max_slots: u32,
    pub lock_dir: PathBuf,
    pub standby_lock_dir: PathBuf,
    /// Standby poll period.
    pub interval: Duration,
    pub retries: RetryPolicy,
}

impl SlotConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_slots: config.max_procs,
            standby_max_slots: config.standby_max_procs,
            lock_dir: config.lock_dir.clone(),
            standby_lock_dir: config.standby_lock_dir.clone(),
            interval: Duration::from_secs(config.interval),
            retries: config.retries.clone(),
        }
    }
}

/// An exclusively held slot lock.
///
/// The lock lives in the open descriptor: dropping the value (or losing the
/// descriptor any other way, including process exit) releases it.
#[derive(Debug)]
pub struct SlotLock {
    file: File,
    slot: u32,
    path: PathBuf,
}

impl SlotLock {
    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    /// Clear CLOEXEC so the descriptor (and with it the lock) survives exec.
    ///
    /// Rust opens files with CLOEXEC set; payloads that re-exec themselves
    /// need the main lock to ride along.
    pub fn clear_cloexec(&self) -> Result<(), SlotError> {
        let fd = self.file.as_raw_fd();
        let flags = fcntl(fd, FcntlArg::F_GETFD).map_err(SlotError::Fcntl)?;
        let mut flags = FdFlag::from_bits_truncate(flags);
        flags.remove(FdFlag::FD_CLOEXEC);
        fcntl(fd, FcntlArg::F_SETFD(flags)).map_err(SlotError::Fcntl)?;
        Ok(())
    }
}

/// Two-level slot allocator.
#[derive(Debug)]
pub struct SlotAllocator {
    config: SlotConfig,
}

impl SlotAllocator {
    pub fn new(config: SlotConfig) -> Self {
        Self { config }
    }

    /// Acquire a main slot, camping on a standby slot while none is free.
    ///
    /// Returns `Ok(Some(lock))` with a main slot, or `Ok(None)` when no slot
    /// could be had: every slot taken, the retry policy exhausted, or the
    /// hook vetoed with [`RetryDecision::Stop`].
    ///
    /// The hook runs once per retry round, before the sleep, with the 1-based
    /// attempt number and the held standby slot id. When promotion succeeds
    /// the standby lock is released before the caller sees the main lock.
    pub fn acquire<H>(&self, mut hook: H) -> Result<Option<SlotLock>, SlotError>
    where
        H: FnMut(u32, u32) -> RetryDecision,
    {
        std::fs::create_dir_all(&self.config.lock_dir)
            .map_err(|e| SlotError::LockDir(self.config.lock_dir.clone(), e))?;
        std::fs::create_dir_all(&self.config.standby_lock_dir)
            .map_err(|e| SlotError::LockDir(self.config.standby_lock_dir.clone(), e))?;

        if let Some(lock) = self.try_band(&self.config.lock_dir, self.config.max_slots)? {
            debug!(slot = lock.slot(), "acquired main slot");
            return Ok(Some(lock));
        }

        let standby = match self.try_band(
            &self.config.standby_lock_dir,
            self.config.standby_max_slots,
        )? {
            Some(lock) => lock,
            None => {
                debug!("no main or standby slot free");
                return Ok(None);
            }
        };
        debug!(slot = standby.slot(), "acquired standby slot, polling for promotion");

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            if hook(attempt, standby.slot()) == RetryDecision::Stop {
                debug!(attempt, "retry hook stopped the promotion loop");
                return Ok(None);
            }
            if !self.config.retries.allows(attempt) {
                debug!(attempt, "retry policy exhausted");
                return Ok(None);
            }
            std::thread::sleep(self.config.interval);
            if let Some(main) = self.try_band(&self.config.lock_dir, self.config.max_slots)? {
                debug!(
                    main = main.slot(),
                    standby = standby.slot(),
                    attempt,
                    "promoted standby to main"
                );
                drop(standby);
                return Ok(Some(main));
            }
            trace!(attempt, "no main slot free yet");
        }
    }

    /// Try each slot in a band once, non-blocking.
    fn try_band(&self, dir: &Path, slots: u32) -> Result<Option<SlotLock>, SlotError> {
        for slot in 1..=slots {
            if let Some(lock) = try_slot(dir, slot)? {
                return Ok(Some(lock));
            }
        }
        Ok(None)
    }
}

/// Attempt a non-blocking exclusive flock on one slot's lock file.
///
/// Open without truncation so a held lock file's inode is left alone.
fn try_slot(dir: &Path, slot: u32) -> Result<Option<SlotLock>, SlotError> {
    let path = dir.join(format!("{slot}.lock"));
    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)
        .map_err(|e| SlotError::Open(path.clone(), e))?;

    match file.try_lock_exclusive() {
        Ok(()) => Ok(Some(SlotLock { file, slot, path })),
        Err(ref e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(None),
        Err(e) => Err(SlotError::Lock(path, e)),
    }
}

/// Allocator errors.
#[derive(Debug, Error)]
pub enum SlotError {
    #[error("failed to create lock directory {0}: {1}")]
    LockDir(PathBuf, #[source] std::io::Error),

    #[error("failed to open lock file {0}: {1}")]
    Open(PathBuf, #[source] std::io::Error),

    #[error("failed to lock {0}: {1}")]
    Lock(PathBuf, #[source] std::io::Error),

    #[error("fcntl on lock descriptor failed: {0}")]
    Fcntl(nix::errno::Errno),
}

#[cfg(test)]
#[path = "slot_tests.rs"]
mod tests;
