//! Pre-dispatch policy for worker agents.
//!
//! Gates the hand-off of a sub-task to a worker: an existing but unbound
//! lock refuses dispatch until the coordinator has bound the session; a
//! valid session-matched lock enriches the worker's prompt with the
//! compressed knowledge summary, the phase-index task context, and any
//! constraint sections from the task document. No lock at all means
//! coordination is inactive for this project and dispatch passes silently.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use task_coordinator_sdk::{HookEvent, HookResponse, HookSpecificOutput};
use tracing::{debug, info};

use super::read_project_lock;
use crate::config::CoordConfig;
use crate::knowledge;
use crate::search;
use crate::task::paths;

const BIND_FIRST_DIRECTIVE: &str = "taskcoord: task lock exists but no session is bound. \
    REQUIRED: call tc-coordinator FIRST to initialize and bind this session, then re-run your agent.";

static ROLE_TEST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:test(?:er)?|qa|sdet)\b").unwrap());
static ROLE_REVIEW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:review(?:er)?|check(?:er)?|audit(?:or)?)\b").unwrap());
static ROLE_DEV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:dev(?:eloper)?|implement(?:er)?|cod(?:er|ing)|engineer|architect|build(?:er)?|fix(?:er)?)\b")
        .unwrap()
});
static COMMENT_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*<!--.*-->\s*$").unwrap());

pub fn handle(event: &HookEvent, config: &CoordConfig, root: &Path) -> HookResponse {
    let Some(tool_input) = &event.tool_input else {
        return HookResponse::allow();
    };
    let Some(agent) = tool_input.subagent_type.as_deref() else {
        return HookResponse::allow();
    };
    let session_id = event.session_id.as_deref().unwrap_or("");

    let mut prompt = tool_input.prompt.clone().unwrap_or_default();
    let mut modified = false;

    // The search reminder goes to every agent, system ones included.
    if search::is_configured(root) {
        prompt = format!("{}\n\n{}", search::SEARCH_REMINDER, prompt);
        modified = true;
        debug!(agent, "search reminder injected");
    }

    if !config.is_system_agent(agent) {
        match read_project_lock(root) {
            Some((_, Some(record))) if record.session_id.is_none() => {
                // Dispatch before binding would let workers run outside the
                // ownership protocol.
                debug!(agent, "dispatch refused: lock unbound");
                return HookResponse::allow().with_output(HookSpecificOutput::deny(BIND_FIRST_DIRECTIVE));
            }
            Some((_, Some(record))) if record.session_id.as_deref() == Some(session_id) => {
                let task_path = root.join(&record.task_path);

                let entries = knowledge::read_all(&paths::knowledge_path(&task_path));
                if !entries.is_empty() {
                    let summary = knowledge::compress(&entries, config.knowledge.max_tokens);
                    if !summary.is_empty() {
                        prompt = format!("{}\n\n{}", summary, prompt);
                        modified = true;
                        info!(agent, entries = entries.len(), "knowledge injected");
                    }
                }

                if paths::phases_dir(&task_path).exists() {
                    let context = format!(
                        "## Task Context\nTask dir: {}\nArtifacts: {}\n\n\
                         > READ the phases/ file referenced in your task description FIRST before doing any work.",
                        paths::task_dir(&task_path).display(),
                        paths::artifacts_dir(&task_path).display(),
                    );
                    prompt = format!("{}\n\n{}", context, prompt);
                    modified = true;
                    debug!(agent, "task context injected");
                }

                if let Some(constraints) = constraints_for(&task_path, agent) {
                    prompt = format!("## Task Constraints\n{}\n\n{}", constraints, prompt);
                    modified = true;
                    debug!(agent, "constraints injected");
                }
            }
            _ => {} // No lock, or owned by another session: pass through.
        }
    }

    if modified {
        let mut updated = tool_input.clone();
        updated.prompt = Some(prompt);
        HookResponse::allow().with_output(HookSpecificOutput::allow_with_input(&updated))
    } else {
        HookResponse::allow()
    }
}

/// Constraint sections from the task document: `<!-- ALL -->` applies to
/// every worker, plus one role section picked from the agent name.
fn constraints_for(task_path: &Path, agent: &str) -> Option<String> {
    let content = std::fs::read_to_string(task_path).ok()?;

    let all = parse_section(&content, "ALL");
    let role_section = role_for(agent)
        .map(|role| parse_section(&content, role))
        .unwrap_or_default();

    let combined: Vec<&str> = [all.as_str(), role_section.as_str()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();
    (!combined.is_empty()).then(|| combined.join("\n"))
}

fn role_for(agent: &str) -> Option<&'static str> {
    let name = agent.to_lowercase();
    if ROLE_TEST_RE.is_match(&name) {
        Some("TEST")
    } else if ROLE_REVIEW_RE.is_match(&name) {
        Some("REVIEW")
    } else if ROLE_DEV_RE.is_match(&name) {
        Some("DEV")
    } else {
        None
    }
}

/// Extract the body between `<!-- TAG -->` and `<!-- /TAG -->`, dropping
/// pure comment lines.
fn parse_section(content: &str, tag: &str) -> String {
    let start_tag = format!("<!-- {} -->", tag);
    let end_tag = format!("<!-- /{} -->", tag);

    let Some(start) = content.find(&start_tag) else {
        return String::new();
    };
    let body_start = start + start_tag.len();
    let Some(end) = content[body_start..].find(&end_tag) else {
        return String::new();
    };

    content[body_start..body_start + end]
        .lines()
        .filter(|line| !COMMENT_LINE_RE.is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
