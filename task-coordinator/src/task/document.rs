//! Task document mutation.
//!
//! The only mutation the protocol performs on a task document is rewriting
//! its `status:` line. Everything else in the document belongs to whoever
//! holds the lock.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::error;

use super::status::TaskStatus;
use crate::fsutil;

static STATUS_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^status:\s*.+$").unwrap());

/// Replace the document's `status:` line, inserting one if absent, via
/// atomic replace. Returns false on any failure; callers treat that as a
/// degraded-but-continue condition.
pub fn update_status(task_path: &Path, new_status: TaskStatus) -> bool {
    let content = match std::fs::read_to_string(task_path) {
        Ok(c) => c,
        Err(e) => {
            error!(path = %task_path.display(), error = %e, "status update: read failed");
            return false;
        }
    };

    let status_line = format!("status: {}", new_status);
    let updated = if STATUS_LINE_RE.is_match(&content) {
        STATUS_LINE_RE.replace(&content, status_line.as_str()).into_owned()
    } else {
        insert_status_line(&content, &status_line)
    };

    match fsutil::atomic_write(task_path, &updated) {
        Ok(()) => true,
        Err(e) => {
            error!(path = %task_path.display(), error = %e, "status update: write failed");
            false
        }
    }
}

/// No existing status line: slot one into the frontmatter if the document
/// has one, otherwise prepend it.
fn insert_status_line(content: &str, status_line: &str) -> String {
    if let Some(rest) = content.strip_prefix("---") {
        if let Some(end) = rest.find("---") {
            let split = 3 + end;
            return format!("{}{}\n{}", &content[..split], status_line, &content[split..]);
        }
    }
    format!("{}\n\n{}", status_line, content)
}
