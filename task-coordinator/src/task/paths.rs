//! Task directory layout.
//!
//! Everything the protocol touches lives under the project root:
//!
//! ```text
//! .claude/TASK.md                      active-task reference (one line)
//! .claude/tasks/<name>_task/PLAN.md    task document
//! .claude/tasks/<name>_task/.lock      lock record
//! .claude/tasks/<name>_task/KNOWLEDGE.jsonl
//! .claude/tasks/<name>_task/phases/    phase index (structured dialect)
//! .claude/tasks/<name>_task/artifacts/ per-phase agent outputs
//! .claude/tasks/cfg/                   config + state
//! ```

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

static TASK_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.claude/tasks/.*_task/PLAN\.md$").unwrap());

/// Validate a task path taken from untrusted persisted state (the lock
/// record or the active-task reference). Rejects parent-directory traversal
/// and anything outside the expected layout.
pub fn validate_task_path(task_path: &str) -> bool {
    if task_path.is_empty() || task_path.contains("..") {
        return false;
    }
    TASK_PATH_RE.is_match(task_path)
}

/// Resolve the active task document from the `.claude/TASK.md` reference.
///
/// Returns the absolute path only when the reference is well-formed, safe,
/// and the document actually exists.
pub fn active_task_path(root: &Path) -> Option<PathBuf> {
    let ref_path = root.join(".claude").join("TASK.md");
    let content = match std::fs::read_to_string(&ref_path) {
        Ok(c) => c,
        Err(_) => {
            debug!("no active task reference");
            return None;
        }
    };

    let first_line = content.trim().lines().next()?.trim();
    if !validate_task_path(first_line) {
        return None;
    }

    let task_path = root.join(first_line);
    task_path.exists().then_some(task_path)
}

pub fn task_dir(task_path: &Path) -> PathBuf {
    task_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn lock_path(task_path: &Path) -> PathBuf {
    task_dir(task_path).join(".lock")
}

pub fn knowledge_path(task_path: &Path) -> PathBuf {
    task_dir(task_path).join("KNOWLEDGE.jsonl")
}

pub fn artifacts_dir(task_path: &Path) -> PathBuf {
    task_dir(task_path).join("artifacts")
}

pub fn phases_dir(task_path: &Path) -> PathBuf {
    task_dir(task_path).join("phases")
}
