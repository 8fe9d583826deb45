//! Pre-reset handoff.
//!
//! Runs just before the runtime resets (compacts) the session context.
//! Never blocks the reset; it only snapshots enough state for the resuming
//! session: compact the ledger if due, record the handoff in the ledger,
//! flip the task status to `handoff`, and persist the bookkeeping blob.
//!
//! The session id does not change across a context reset, so the lock stays
//! bound; the `handoff` status exists for the resuming caller to notice,
//! not for a new session to take over.

use std::path::Path;

use chrono::Utc;
use task_coordinator_sdk::{HookEvent, HookResponse};
use tracing::{info, warn};

use super::read_project_lock;
use crate::config::CoordConfig;
use crate::knowledge;
use crate::state;
use crate::task::{descriptor, document, paths, TaskStatus};

pub fn handle(event: &HookEvent, config: &CoordConfig, root: &Path) -> HookResponse {
    let session_id = event.session_id.as_deref().unwrap_or("");

    let Some((_, Some(record))) = read_project_lock(root) else {
        return HookResponse::proceed();
    };
    if record.session_id.as_deref() != Some(session_id) {
        // Not our task; nothing to hand off.
        return HookResponse::proceed();
    }

    let task_path = root.join(&record.task_path);
    let Some(task) = descriptor::load(&task_path) else {
        warn!("task document unreadable before reset");
        return HookResponse::proceed();
    };

    if task.status.is_terminal() {
        return HookResponse::proceed();
    }

    // Expected artifacts are advisory: a missing phase directory is worth a
    // warning but never blocks the reset.
    if !phase_artifacts_present(&task_path, task.current_phase) {
        warn!(phase = task.current_phase, "artifacts directory missing for current phase");
    }

    let knowledge_path = paths::knowledge_path(&task_path);
    if knowledge_path.exists() && knowledge::compact(&knowledge_path, config.knowledge.max_entries)
    {
        info!("ledger compacted before reset");
    }

    knowledge::write_handoff_entry(
        &knowledge_path,
        task.current_phase,
        "context auto-compact",
        &config.knowledge,
    );

    document::update_status(&task_path, TaskStatus::Handoff);

    let now = Utc::now().to_rfc3339();
    let coord_state = state::CoordState {
        last_handoff: Some(now.clone()),
        last_phase: Some(task.current_phase),
        last_compact_at: Some(now),
    };
    state::save(root, &coord_state);

    info!(phase = task.current_phase, "handoff recorded before context reset");

    HookResponse::proceed().with_system_message(format!(
        "taskcoord: compact handoff, phase {}/{}",
        task.current_phase, task.total_phases,
    ))
}

/// Any artifacts entry named `<phase>-...` counts as presence.
fn phase_artifacts_present(task_path: &Path, phase: u32) -> bool {
    let artifacts = paths::artifacts_dir(task_path);
    let prefix = format!("{}-", phase);
    match std::fs::read_dir(&artifacts) {
        Ok(entries) => entries
            .flatten()
            .any(|entry| entry.file_name().to_string_lossy().starts_with(&prefix)),
        Err(_) => false,
    }
}
