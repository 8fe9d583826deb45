//! Coordination policies: one module per runtime lifecycle event.
//!
//! Each `handle` is a single synchronous pass: read the lock (and through
//! it the task document), decide, optionally touch the ledger, answer. No
//! policy may fail the caller: every degenerate input degrades to the
//! neutral decision.

pub mod post_task;
pub mod pre_compact;
pub mod pre_task;
pub mod session_start;
pub mod stop;
pub mod user_prompt;

use std::path::Path;

use tracing::warn;

use crate::lock::{self, LockRecord, TaskLock, DEFAULT_STALE_HOURS};

/// The distinguished coordinating agent.
pub fn is_coordinator(agent_type: &str) -> bool {
    agent_type == "tc-coordinator" || agent_type == "taskcoord:tc-coordinator"
}

/// First 8 characters of a session id, for logs and annotations.
pub fn short_session(session_id: &str) -> &str {
    session_id.get(..8).unwrap_or(session_id)
}

/// Read the active task's lock, evicting it first when stale.
///
/// `None`: no active task in this project. `Some((lock, None))`: task is
/// active but no (surviving) lock record exists. Every policy that reads
/// the lock goes through here, so a stale lock is gone before any decision
/// is made from it.
pub fn read_project_lock(root: &Path) -> Option<(TaskLock, Option<LockRecord>)> {
    let lock = TaskLock::for_project(root)?;
    let record = lock.get_raw();

    if let Some(existing) = &record {
        if lock::is_stale(existing, DEFAULT_STALE_HOURS) {
            warn!(
                threshold_hours = DEFAULT_STALE_HOURS,
                "stale lock detected, evicting"
            );
            lock.delete();
            return Some((lock, None));
        }
    }

    Some((lock, record))
}
