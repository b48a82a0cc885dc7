// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hadc-core: Core library for the hadc process supervisor
//!
//! Coordination happens entirely through the filesystem: exclusive flock
//! slots under the lock directories, pid files in the pid directory, and a
//! stop-file sentinel. No resident daemon, no shared memory.

pub mod config;
pub mod env;
pub mod pidfile;
pub mod process;
pub mod slot;
pub mod stopfile;
pub mod template;

pub use config::{Config, ConfigError};
pub use pidfile::{PidFile, PidFileError, WorkerKind, WorkerTag};
pub use process::{is_alive, send_signal, ProcessError};
pub use slot::{RetryDecision, RetryPolicy, SlotAllocator, SlotConfig, SlotError, SlotLock};
pub use stopfile::StopFile;
