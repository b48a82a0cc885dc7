// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command state machine: one `do_*` handler per control action.
//!
//! Handlers return the process exit code. Fatal conditions (filesystem
//! failures, EPERM on signals, fork failure) surface as `CommandError`;
//! reconciliation deficits are reported on stdout and become exit code 1.

use tracing::{info, warn};

use hadc_core::pidfile::{self, WorkerKind, WorkerTag};
use hadc_core::process;
use nix::sys::signal::Signal;

use crate::{init_script, reconcile, status, CommandError, Supervisor};

/// Valid action tokens, in dispatch order.
pub const ACTIONS: &[&str] = &[
    "start",
    "stop",
    "restart",
    "hard_restart",
    "status",
    "reload",
    "fork",
    "get_init_file",
];

/// Dispatch one action token. Leading dashes are stripped, so `--start`
/// and `start` are the same request.
pub fn dispatch(sup: &Supervisor, action: &str) -> Result<i32, CommandError> {
    let action = action.trim_start_matches('-');
    match action {
        "start" => do_start(sup),
        "stop" => do_stop(sup),
        "restart" => do_restart(sup),
        "hard_restart" => do_hard_restart(sup),
        "status" => do_status(sup),
        "reload" => do_reload(sup),
        "fork" => do_fork(sup),
        "get_init_file" => do_get_init_file(sup),
        _ => Err(CommandError::UnknownAction {
            given: action.to_string(),
            valid: ACTIONS.join(", "),
        }),
    }
}

/// Bring up the full population: mains first, then standbys.
pub fn do_start(sup: &Supervisor) -> Result<i32, CommandError> {
    let config = sup.config();
    ensure_pid_dir(sup)?;
    sup.stop_file()
        .remove()
        .map_err(|e| CommandError::StopFile(config.stop_file.clone(), e))?;

    let mains_ok = reconcile::fork_until(sup, WorkerKind::Main)?;
    let standbys_ok = reconcile::fork_until(sup, WorkerKind::Standby)?;

    let all_running = status::dump(sup)?;
    if mains_ok && standbys_ok && all_running {
        Ok(0)
    } else {
        reconcile::warn_stolen_locks(sup)?;
        Ok(1)
    }
}

/// Tear everything down: stop file for the standbys, kill escalation for
/// the mains.
pub fn do_stop(sup: &Supervisor) -> Result<i32, CommandError> {
    let config = sup.config();
    let mains = reconcile::running_count(sup, WorkerKind::Main)?;
    let standbys = reconcile::running_count(sup, WorkerKind::Standby)?;
    if mains == 0 && standbys == 0 {
        info!("nothing is running");
        status::dump(sup)?;
        return Ok(0);
    }

    sup.stop_file()
        .create()
        .map_err(|e| CommandError::StopFile(config.stop_file.clone(), e))?;

    if !reconcile::wait_for_population(sup, WorkerKind::Standby, 0, config.standby_timeout)? {
        warn!("standbys did not exit within the timeout");
    }

    let mains_stopped = reconcile::stop_mains(sup)?;
    let standbys_left = reconcile::running_count(sup, WorkerKind::Standby)?;

    if mains_stopped && standbys_left == 0 {
        info!("all workers stopped");
        Ok(0)
    } else {
        status::dump(sup)?;
        Ok(1)
    }
}

/// How `restart` should proceed, given what is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RestartStrategy {
    /// Nothing is running; a plain start does the job.
    Start,
    /// No standbys configured, nobody can promote: stop then start.
    Hard,
    /// Cycle standbys and hand each main slot to a promoted standby.
    Rolling,
}

pub(crate) fn restart_strategy(mains: u32, standbys: u32, standby_max: u32) -> RestartStrategy {
    if mains == 0 && standbys == 0 {
        RestartStrategy::Start
    } else if standby_max == 0 {
        RestartStrategy::Hard
    } else {
        RestartStrategy::Rolling
    }
}

/// Rolling restart: cycle standbys, then restart each main in place and let
/// a standby promote into the freed slot.
pub fn do_restart(sup: &Supervisor) -> Result<i32, CommandError> {
    let config = sup.config();
    let mains = reconcile::running_count(sup, WorkerKind::Main)?;
    let standbys = reconcile::running_count(sup, WorkerKind::Standby)?;
    match restart_strategy(mains, standbys, config.standby_max_procs) {
        RestartStrategy::Start => return do_start(sup),
        RestartStrategy::Hard => return do_hard_restart(sup),
        RestartStrategy::Rolling => {}
    }

    ensure_pid_dir(sup)?;

    // Cycle the standbys so promotion happens with fresh workers.
    sup.stop_file()
        .create()
        .map_err(|e| CommandError::StopFile(config.stop_file.clone(), e))?;
    if !reconcile::wait_for_population(sup, WorkerKind::Standby, 0, config.standby_timeout)? {
        warn!("standbys did not exit within the timeout");
    }
    sup.stop_file()
        .remove()
        .map_err(|e| CommandError::StopFile(config.stop_file.clone(), e))?;
    if !reconcile::fork_until(sup, WorkerKind::Standby)? {
        warn!("could not refill standbys before restarting mains");
    }

    for slot in 1..=config.max_procs {
        if !reconcile::restart_main(sup, slot)? {
            warn!(slot, "main restart did not hand over to a standby");
        }
    }

    let mains_ok = reconcile::fork_until(sup, WorkerKind::Main)?;
    let standbys_ok = reconcile::fork_until(sup, WorkerKind::Standby)?;

    let all_running = status::dump(sup)?;
    Ok(if mains_ok && standbys_ok && all_running {
        0
    } else {
        1
    })
}

/// Full stop followed by a fresh start. The start's exit code wins.
pub fn do_hard_restart(sup: &Supervisor) -> Result<i32, CommandError> {
    let stop_code = do_stop(sup)?;
    if stop_code != 0 {
        warn!("stop finished with leftovers, starting anyway");
    }
    do_start(sup)
}

/// Report Running/Not Running per expected slot.
pub fn do_status(sup: &Supervisor) -> Result<i32, CommandError> {
    Ok(if status::dump(sup)? { 0 } else { 1 })
}

/// SIGHUP every live main worker.
pub fn do_reload(sup: &Supervisor) -> Result<i32, CommandError> {
    let config = sup.config();
    for slot in 1..=config.max_procs {
        let tag = WorkerTag::main(slot);
        if let Some(pid) = pidfile::live_pid(&config.pid_dir, &tag)? {
            info!(slot, pid, "sending SIGHUP");
            process::send_signal(pid, Signal::SIGHUP)?;
        }
    }
    Ok(0)
}

/// Top up both populations without waiting; refused under a stop file.
pub fn do_fork(sup: &Supervisor) -> Result<i32, CommandError> {
    if sup.stop_file().exists() {
        info!("stop file present, not forking");
        return Ok(1);
    }
    ensure_pid_dir(sup)?;
    reconcile::top_up(sup, WorkerKind::Main)?;
    reconcile::top_up(sup, WorkerKind::Standby)?;
    Ok(0)
}

/// Emit the init script on stdout.
pub fn do_get_init_file(sup: &Supervisor) -> Result<i32, CommandError> {
    print!("{}", init_script::render(sup));
    Ok(0)
}

fn ensure_pid_dir(sup: &Supervisor) -> Result<(), CommandError> {
    let dir = &sup.config().pid_dir;
    std::fs::create_dir_all(dir).map_err(|e| CommandError::PidDir(dir.clone(), e))
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
