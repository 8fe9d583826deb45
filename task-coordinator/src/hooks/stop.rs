//! Stop/exit gate.
//!
//! The one policy that ever blocks: a session owning an unfinished task is
//! told to resume instead of stopping. Every other configuration allows the
//! stop: a lock this process does not own is never its business, and every
//! failure mode degrades toward letting the caller go. The blocking
//! directive always carries the manual override (delete the lock file) so
//! nobody is ever actually trapped.

use std::path::Path;

use task_coordinator_sdk::{HookEvent, HookResponse, HookSpecificOutput};
use tracing::{debug, info, warn};

use super::read_project_lock;
use crate::config::CoordConfig;
use crate::task::{descriptor, paths};

pub fn handle(event: &HookEvent, _config: &CoordConfig, root: &Path) -> HookResponse {
    // The runtime retries a previously blocked stop with this flag set;
    // refusing again would loop forever.
    if event.stop_hook_active {
        return HookResponse::allow();
    }

    let session_id = event.session_id.as_deref().unwrap_or("");

    let Some((lock, record)) = read_project_lock(root) else {
        // No active task in this project.
        return HookResponse::allow();
    };
    let Some(record) = record else {
        // Task reference exists but it was never started (or the lock was
        // just evicted as stale).
        debug!("no lock for active task, stop allowed");
        return HookResponse::allow();
    };

    let Some(bound) = record.session_id.as_deref() else {
        // Nobody ever claimed the lock; it cannot be blocking anyone.
        warn!("unbound lock at stop, evicting");
        lock.delete();
        return HookResponse::allow();
    };

    if bound != session_id {
        debug!("lock owned by another session, stop allowed");
        return HookResponse::allow();
    }

    let task_path = root.join(&record.task_path);
    if !task_path.exists() {
        warn!("lock points at a missing task document, evicting");
        lock.delete();
        return HookResponse::allow();
    }

    let Some(task) = descriptor::load(&task_path) else {
        warn!("task document unreadable, evicting lock");
        lock.delete();
        return HookResponse::allow();
    };

    if task.status.is_terminal() {
        if paths::knowledge_path(&task_path).exists() {
            info!("task finished; ledger available for rules extraction");
        }
        lock.delete();
        return HookResponse::allow();
    }

    warn!(
        status = %task.status,
        phase = task.current_phase,
        total = task.total_phases,
        "stop blocked, task incomplete"
    );

    HookResponse::block(format!(
        "taskcoord: task incomplete ({}, phase {}/{})\nEmergency exit: rm {}",
        task.status,
        task.current_phase,
        task.total_phases,
        lock.path().display(),
    ))
    .with_output(HookSpecificOutput::context(
        "Stop",
        format!(
            "taskcoord: stop blocked. Continue execution. Re-read PLAN.md and proceed with \
             phase {}. Task: {}",
            task.current_phase, record.task_path,
        ),
    ))
}
