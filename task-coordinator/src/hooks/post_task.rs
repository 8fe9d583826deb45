//! Post-completion policy for worker agents.
//!
//! Two jobs: bind the session to the lock when the coordinator finishes
//! (the only path from unbound to bound), and hand every finished
//! non-system worker the mandatory follow-up protocol so its output gets
//! persisted and fed back through the coordinator.

use std::path::Path;

use task_coordinator_sdk::{HookEvent, HookResponse, HookSpecificOutput};
use tracing::{debug, info};

use super::{is_coordinator, read_project_lock, short_session};
use crate::config::CoordConfig;
use crate::task::paths;

pub fn handle(event: &HookEvent, config: &CoordConfig, root: &Path) -> HookResponse {
    let Some(tool_input) = &event.tool_input else {
        return HookResponse::allow();
    };
    let Some(agent) = tool_input.subagent_type.as_deref() else {
        return HookResponse::allow();
    };
    let session_id = event.session_id.as_deref().unwrap_or("");

    if is_coordinator(agent) {
        return bind_on_completion(root, session_id);
    }

    if config.is_system_agent(agent) {
        return HookResponse::allow();
    }

    let Some((_, Some(record))) = read_project_lock(root) else {
        // No lock: coordination is not active here.
        return HookResponse::allow();
    };

    match record.session_id.as_deref() {
        None => HookResponse::allow().with_output(HookSpecificOutput::context(
            "PostToolUse",
            "taskcoord: task lock exists but no session is bound. REQUIRED: call tc-coordinator \
             FIRST to initialize and bind this session, then re-run your agent.",
        )),
        Some(bound) if bound != session_id => HookResponse::allow(),
        Some(_) => {
            let failed = event.tool_result.as_ref().is_some_and(|r| r.is_error);
            let task_path = root.join(&record.task_path);
            let phase_indexed = paths::phases_dir(&task_path).exists();
            let directive = follow_up_directive(agent, failed, phase_indexed);
            HookResponse::allow()
                .with_output(HookSpecificOutput::context("PostToolUse", directive))
        }
    }
}

/// The coordinator just completed: claim the lock for this session if it is
/// still unbound. Losing the bind race is not an error: the winner's
/// session simply owns the task.
fn bind_on_completion(root: &Path, session_id: &str) -> HookResponse {
    let Some((lock, Some(record))) = read_project_lock(root) else {
        return HookResponse::allow();
    };
    if record.session_id.is_some() || session_id.is_empty() {
        return HookResponse::allow();
    }

    if lock.bind(session_id) {
        info!(session = short_session(session_id), "session bound to lock");
        HookResponse::allow().with_output(HookSpecificOutput::context(
            "PostToolUse",
            format!("taskcoord: session {} bound to lock", short_session(session_id)),
        ))
    } else {
        debug!(session = short_session(session_id), "bind failed after coordinator completion");
        HookResponse::allow()
    }
}

/// The mandatory two-step follow-up. Wording differs for success vs.
/// failure, and phase-indexed tasks get the status-update and dependency
/// cascade steps on top.
fn follow_up_directive(agent: &str, failed: bool, phase_indexed: bool) -> String {
    let agent_name = agent.to_uppercase();
    if failed {
        let base = format!(
            "{} FAILED -> 1. Retry once with same agent 2. If retry fails: \
             TaskUpdate(taskId, status=\"failed\"), apply Escalation 3. Do NOT write report, \
             do NOT call tc-coordinator",
            agent_name
        );
        if phase_indexed {
            format!(
                "{}\n4. Persist failure to KNOWLEDGE.jsonl\n5. Check for blocked dependents -> \
                 cascade failure\nDO NOT read phases/ files (agents only).",
                base
            )
        } else {
            base
        }
    } else {
        let base = format!(
            "{} DONE -> 1. WRITE report 2. CALL tc-coordinator NOW",
            agent_name
        );
        if phase_indexed {
            format!(
                "{}\n3. TaskUpdate(taskId, status=\"completed\")\n4. TaskList() -> find next \
                 ready task\nDO NOT read phases/ files (agents only).",
                base
            )
        } else {
            base
        }
    }
}
