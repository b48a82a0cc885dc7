// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciliation: observe the running population through the pid registry
//! and drive it toward the expected population.
//!
//! All waits are bounded 1-second polls. The supervisor never blocks
//! indefinitely; after the retry budget it reports the deficit and exits
//! non-zero.

use std::time::{Duration, Instant};

use nix::sys::signal::Signal;
use nix::sys::wait::waitpid;
use nix::unistd::{fork, setsid, ForkResult};
use tracing::{debug, info, warn};

use hadc_core::pidfile::{self, WorkerKind, WorkerTag};
use hadc_core::process;

use crate::{worker, CommandError, SpawnError, Supervisor};

/// Rounds of spawn-then-wait before `fork_until` gives up.
pub(crate) const FORK_ROUNDS: u32 = 3;

/// Kill escalation ladder. Two TERMs before anything harsher; KILL last.
pub(crate) const ESCALATION: [Signal; 4] = [
    Signal::SIGTERM,
    Signal::SIGTERM,
    Signal::SIGINT,
    Signal::SIGKILL,
];

const POLL: Duration = Duration::from_secs(1);

/// Count expected slots of `kind` whose pid file names a live process.
pub fn running_count(sup: &Supervisor, kind: WorkerKind) -> Result<u32, CommandError> {
    let config = sup.config();
    let mut running = 0;
    for slot in 1..=config.expected(kind) {
        let tag = WorkerTag::new(kind, slot);
        if pidfile::live_pid(&config.pid_dir, &tag)?.is_some() {
            running += 1;
        }
    }
    Ok(running)
}

/// Spawn a detached worker via double fork.
///
/// The intermediate child calls `setsid` and forks again, then exits; the
/// grandchild runs the worker lifecycle and never returns. The supervisor
/// reaps the intermediate child so no zombie is left behind.
pub(crate) fn spawn_worker(sup: &Supervisor) -> Result<(), SpawnError> {
    match unsafe { fork() }.map_err(SpawnError::Fork)? {
        ForkResult::Parent { child } => {
            waitpid(child, None).map_err(SpawnError::Wait)?;
            Ok(())
        }
        ForkResult::Child => {
            // Intermediate child: detach into a new session, fork the real
            // worker, get out of the way.
            let _ = setsid();
            match unsafe { fork() } {
                Ok(ForkResult::Parent { .. }) => std::process::exit(0),
                Ok(ForkResult::Child) => {
                    let code = worker::run(sup);
                    std::process::exit(code);
                }
                Err(_) => std::process::exit(1),
            }
        }
    }
}

/// Poll until the population of `kind` equals `target`, up to `timeout_secs`.
pub fn wait_for_population(
    sup: &Supervisor,
    kind: WorkerKind,
    target: u32,
    timeout_secs: u64,
) -> Result<bool, CommandError> {
    let deadline = Instant::now() + Duration::from_secs(timeout_secs);
    loop {
        if running_count(sup, kind)? == target {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        std::thread::sleep(POLL);
    }
}

/// Spawn workers until the expected population of `kind` is running.
///
/// Up to [`FORK_ROUNDS`] rounds of: spawn one worker per missing slot, then
/// wait the kind's reconciliation timeout for the population to settle.
pub fn fork_until(sup: &Supervisor, kind: WorkerKind) -> Result<bool, CommandError> {
    let config = sup.config();
    let expected = config.expected(kind);
    if expected == 0 {
        return Ok(true);
    }
    let timeout = config.fork_timeout(kind);

    for round in 1..=FORK_ROUNDS {
        let running = running_count(sup, kind)?;
        let deficit = expected.saturating_sub(running);
        debug!(kind = %kind, round, running, deficit, "reconciling population");
        for _ in 0..deficit {
            spawn_worker(sup)?;
        }
        if wait_for_population(sup, kind, expected, timeout)? {
            info!(kind = %kind, expected, "population reached");
            return Ok(true);
        }
        warn!(
            kind = %kind,
            round,
            running = running_count(sup, kind)?,
            expected,
            "population not reached, retrying"
        );
    }
    Ok(false)
}

/// Spawn one worker per missing slot of `kind`, without waiting.
pub fn top_up(sup: &Supervisor, kind: WorkerKind) -> Result<(), CommandError> {
    let expected = sup.config().expected(kind);
    if expected == 0 {
        return Ok(());
    }
    let running = running_count(sup, kind)?;
    let deficit = expected.saturating_sub(running);
    debug!(kind = %kind, running, deficit, "topping up population");
    for _ in 0..deficit {
        spawn_worker(sup)?;
    }
    Ok(())
}

/// Restart the main worker in `slot`, relying on a standby to promote.
///
/// Escalates through [`ESCALATION`]; after each signal, polls `kill_timeout`
/// seconds for a *different* live PID to appear in the slot's pid file.
/// Success means a standby took over; the old worker's death alone is not
/// enough.
pub fn restart_main(sup: &Supervisor, slot: u32) -> Result<bool, CommandError> {
    let config = sup.config();
    let tag = WorkerTag::main(slot);
    let Some(old_pid) = pidfile::live_pid(&config.pid_dir, &tag)? else {
        return Ok(true);
    };

    for sig in ESCALATION {
        debug!(slot, old_pid, signal = %sig, "signalling main for restart");
        process::send_signal(old_pid, sig)?;
        for _ in 0..config.kill_timeout.max(1) {
            std::thread::sleep(POLL);
            if let Some(new_pid) = pidfile::live_pid(&config.pid_dir, &tag)? {
                if new_pid != old_pid {
                    info!(slot, old_pid, new_pid, "standby promoted into main slot");
                    return Ok(true);
                }
            }
        }
    }
    warn!(slot, old_pid, "no standby promoted into main slot");
    Ok(false)
}

/// Stop every expected main worker with the escalation ladder.
///
/// Returns whether all mains are down. Dead slots have their pid files
/// unlinked; stale files for already-dead PIDs are swept as well.
pub fn stop_mains(sup: &Supervisor) -> Result<bool, CommandError> {
    let config = sup.config();
    let mut all_stopped = true;

    for slot in 1..=config.max_procs {
        let tag = WorkerTag::main(slot);
        let path = tag.path(&config.pid_dir);
        let Some(pid) = pidfile::live_pid(&config.pid_dir, &tag)? else {
            pidfile::unlink_if_present(&path);
            continue;
        };

        let mut dead = false;
        'escalation: for sig in ESCALATION {
            debug!(slot, pid, signal = %sig, "stopping main");
            process::send_signal(pid, sig)?;
            for _ in 0..config.kill_timeout.max(1) {
                std::thread::sleep(POLL);
                if !process::is_alive(pid)? {
                    dead = true;
                    break 'escalation;
                }
            }
        }

        if dead {
            pidfile::unlink_if_present(&path);
            info!(slot, pid, "main stopped");
        } else {
            warn!(slot, pid, "main survived the kill escalation");
            all_stopped = false;
        }
    }
    Ok(all_stopped)
}

/// After a failed start: when every standby came up but mains are missing,
/// the likely culprit is an external flock holder.
pub fn warn_stolen_locks(sup: &Supervisor) -> Result<(), CommandError> {
    let config = sup.config();
    let mains = running_count(sup, WorkerKind::Main)?;
    let standbys = running_count(sup, WorkerKind::Standby)?;

    if mains < config.max_procs && standbys == config.standby_max_procs {
        for slot in 1..=config.max_procs {
            let tag = WorkerTag::main(slot);
            if pidfile::live_pid(&config.pid_dir, &tag)?.is_none() {
                warn!(
                    slot,
                    lock = %config.lock_dir.join(format!("{slot}.lock")).display(),
                    "main slot never came up, something is possibly holding it"
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
