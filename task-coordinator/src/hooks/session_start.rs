//! Session-start annotation.
//!
//! Informational only, never blocks: reports the search collaborator's
//! status (auto-starting its watcher when possible), links the freshest
//! plan file into the project after a clear, and tells a post-compact
//! session to re-read its task state before continuing.

use std::path::Path;
use std::time::{Duration, SystemTime};

use task_coordinator_sdk::{HookEvent, HookResponse, HookSpecificOutput};
use tracing::{info, warn};

use super::short_session;
use crate::config::CoordConfig;
use crate::search;
use crate::task::paths;

/// A plan is only linked while it is fresh from plan mode.
const PLAN_FRESHNESS: Duration = Duration::from_secs(60);

pub async fn handle(event: &HookEvent, config: &CoordConfig, root: &Path) -> HookResponse {
    let session_id = event.session_id.as_deref().unwrap_or("unknown");
    let short = short_session(session_id);
    let source = event.source.as_deref().unwrap_or("startup");

    info!(session = short, source, "session started");

    if source == "clear" {
        match link_latest_plan(root) {
            Ok(Some(name)) => info!(plan = %name, "linked latest plan into project"),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "plan linking failed"),
        }
    }

    let search_status = search::session_status(root, &config.search).await;

    let mut context = format!("taskcoord: active | session: {}", short);
    if source == "compact" && paths::active_task_path(root).is_some() {
        context.push_str(
            "\n\n[HANDOFF after compact] Re-read PLAN.md and KNOWLEDGE.jsonl, then continue \
             the current phase.",
        );
    }
    if search_status.usable {
        context.push('\n');
        context.push_str(search::SEARCH_REMINDER);
    }

    HookResponse::allow()
        .with_system_message(format!(
            "taskcoord: session {} | semsearch: {}",
            short, search_status.message
        ))
        .with_output(HookSpecificOutput::context("SessionStart", context))
}

/// After a clear, surface the plan the user just wrote: symlink
/// `.claude/plans/LATEST.md` at the newest global plan file, but only if it
/// was modified within the last minute.
fn link_latest_plan(root: &Path) -> std::io::Result<Option<String>> {
    let Some(home) = dirs::home_dir() else {
        return Ok(None);
    };
    let global_plans = home.join(".claude").join("plans");
    if !global_plans.exists() {
        return Ok(None);
    }

    let mut newest: Option<(String, std::path::PathBuf, SystemTime)> = None;
    for entry in std::fs::read_dir(&global_plans)?.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.ends_with(".md") {
            continue;
        }
        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        if newest.as_ref().is_none_or(|(_, _, current)| modified > *current) {
            newest = Some((name, entry.path(), modified));
        }
    }

    let Some((name, path, modified)) = newest else {
        return Ok(None);
    };
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO);
    if age > PLAN_FRESHNESS {
        return Ok(None);
    }

    let project_plans = root.join(".claude").join("plans");
    std::fs::create_dir_all(&project_plans)?;
    let latest_link = project_plans.join("LATEST.md");
    let _ = std::fs::remove_file(&latest_link);

    #[cfg(unix)]
    std::os::unix::fs::symlink(&path, &latest_link)?;
    #[cfg(not(unix))]
    std::fs::copy(&path, &latest_link)?;

    Ok(Some(name))
}
