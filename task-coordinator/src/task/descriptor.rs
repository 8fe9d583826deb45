//! Task document parsing.
//!
//! Two dialects share one parse entry point. The structured dialect carries
//! explicit counters in a two-line header and is paired with a `phases/`
//! index directory; the legacy dialect derives progress by counting
//! checkboxes under `Phase N` section headers. Dialect detection is
//! structural: there is no version flag. Parsing is best-effort and never
//! fails: a document with no recognizable structure yields the defaults.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use super::paths;
use super::status::TaskStatus;

static STATUS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^status:\s*(.+)$").unwrap());
static CURRENT_PHASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^current_phase:\s*(\d+)").unwrap());
static TOTAL_PHASES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^total_phases:\s*(\d+)").unwrap());
// `Phase 2V` headers are sub-variant sections, not phases of their own.
static PHASE_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{2,3}\s*Phase\s+(\d+)").unwrap());
static SECTION_COMPLETE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\*?\*?status\*?\*?:\s*completed").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Two-line header with explicit counters, `phases/` index alongside.
    Structured,
    /// Checkbox-counted phase sections.
    Legacy,
}

/// Progress snapshot derived from a task document.
///
/// Computed fresh on every read; never cached across processes.
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    pub status: TaskStatus,
    pub current_phase: u32,
    pub total_phases: u32,
    pub dialect: Dialect,
    pub content: String,
}

/// Read and parse a task document. Read failures return `None`; everything
/// else is handled inside [`parse`].
pub fn load(task_path: &Path) -> Option<TaskDescriptor> {
    let content = match std::fs::read_to_string(task_path) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %task_path.display(), error = %e, "failed to read task document");
            return None;
        }
    };
    let has_phase_index = paths::phases_dir(task_path).exists();
    Some(parse(&content, has_phase_index))
}

/// Parse a task document under either dialect.
pub fn parse(content: &str, has_phase_index: bool) -> TaskDescriptor {
    if has_phase_index {
        if has_structured_header(content) {
            return parse_structured(content);
        }
        // Documents are allowed to be migrated non-atomically: the index
        // directory can appear before the header does.
        warn!("phase index present but document lacks structured header, falling back to legacy parse");
    }
    parse_legacy(content)
}

/// Structured dialect is detected by its header: the first two non-blank
/// lines are `status:` and `current_phase:`.
fn has_structured_header(content: &str) -> bool {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());
    matches!(
        (lines.next(), lines.next()),
        (Some(first), Some(second))
            if first.starts_with("status:") && second.starts_with("current_phase:")
    )
}

fn extract_status(content: &str) -> TaskStatus {
    STATUS_RE
        .captures(content)
        .map(|c| TaskStatus::parse(&c[1]))
        .unwrap_or_default()
}

fn parse_structured(content: &str) -> TaskDescriptor {
    let capture_u32 = |re: &Regex| {
        re.captures(content)
            .and_then(|c| c[1].parse::<u32>().ok())
            .unwrap_or(0)
    };

    TaskDescriptor {
        status: extract_status(content),
        current_phase: capture_u32(&CURRENT_PHASE_RE),
        total_phases: capture_u32(&TOTAL_PHASES_RE),
        dialect: Dialect::Structured,
        content: content.to_string(),
    }
}

/// Phase section headers in document order, sub-variant headers excluded.
fn phase_headers(content: &str) -> Vec<(usize, u32)> {
    PHASE_HEADER_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let digits = caps.get(1).unwrap();
            // A `V` suffix marks a sub-variant section.
            if content[digits.end()..].starts_with('V') {
                return None;
            }
            let number = digits.as_str().parse::<u32>().ok()?;
            Some((caps.get(0).unwrap().start(), number))
        })
        .collect()
}

/// A phase is complete when it has at least one checked box and no open
/// ones, or carries an explicit completion marker. A section with no
/// checkboxes at all is incomplete until a marker closes it.
fn section_complete(section: &str) -> bool {
    let checked = section.matches("[x]").count() + section.matches("[X]").count();
    let unchecked = section.matches("[ ]").count();
    (checked > 0 && unchecked == 0) || SECTION_COMPLETE_RE.is_match(section)
}

fn parse_legacy(content: &str) -> TaskDescriptor {
    let headers = phase_headers(content);
    let mut current_phase = 1;

    for (i, &(start, number)) in headers.iter().enumerate() {
        let end = headers
            .get(i + 1)
            .map(|&(next_start, _)| next_start)
            .unwrap_or(content.len());

        if section_complete(&content[start..end]) {
            current_phase = number + 1;
        } else {
            current_phase = number;
            break;
        }
    }

    TaskDescriptor {
        status: extract_status(content),
        current_phase,
        total_phases: headers.len().max(1) as u32,
        dialect: Dialect::Legacy,
        content: content.to_string(),
    }
}
