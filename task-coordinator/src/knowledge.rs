//! Append-only knowledge ledger.
//!
//! One JSON object per line, written by any qualifying agent, read back as a
//! priority-weighted summary for prompt injection, and destructively
//! compacted once the ledger approaches its size cap. Entries are immutable:
//! superseding a note means appending a newer one with the same content key
//! and letting compaction keep the later timestamp.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::RegexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::KnowledgeConfig;
use crate::fsutil;

/// Low-information phrasings rejected at write time. Status chatter in the
/// ledger crowds out the entries that actually change future decisions.
static DENYLIST: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)^(Working|Starting|Completed|Finished|Beginning)",
        r"(?i)^(Let me|I will|I am|I'll)",
        r"(?i)^(Looks? good|LGTM|Done|Fixed)",
        r"(?i)^Phase \d+",
        r"(?i)^Task (completed|done|finished)",
        r"(?i)^(Now|Next|Then) (I|we|let)",
    ])
    .unwrap()
});

/// Fixed precedence of the priority buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Avoid,
    Success,
    Info,
    Unknown,
}

impl Priority {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "avoid" => Self::Avoid,
            "success" => Self::Success,
            "info" => Self::Info,
            _ => Self::Unknown,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Avoid => "avoid",
            Self::Success => "success",
            Self::Info => "info",
            Self::Unknown => "unknown",
        }
    }
}

/// One ledger note. Unknown fields round-trip through compaction untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeEntry {
    /// Priority tag: avoid | success | info.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    pub txt: String,

    /// Writer attribution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,

    /// RFC 3339 write time, stamped on append when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl KnowledgeEntry {
    pub fn new(priority: Priority, txt: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            t: Some(priority.as_tag().to_string()),
            txt: txt.into(),
            src: Some(src.into()),
            ts: None,
            extra: HashMap::new(),
        }
    }

    pub fn priority(&self) -> Priority {
        self.t
            .as_deref()
            .map(Priority::from_tag)
            .unwrap_or(Priority::Unknown)
    }

    fn parsed_ts(&self) -> Option<DateTime<Utc>> {
        self.ts
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// First 100 characters of the text: the dedup identity used by both
    /// compression and compaction.
    fn content_key(&self) -> String {
        self.txt.chars().take(100).collect()
    }
}

/// Tolerant line-by-line read. Unparseable lines are skipped and counted;
/// entries missing a priority tag are kept with the lowest tag.
pub fn read_all(knowledge_path: &Path) -> Vec<KnowledgeEntry> {
    let content = match std::fs::read_to_string(knowledge_path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(path = %knowledge_path.display(), error = %e, "failed to read ledger");
            return Vec::new();
        }
    };

    let mut invalid = 0usize;
    let entries: Vec<KnowledgeEntry> = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(idx, line)| match serde_json::from_str::<KnowledgeEntry>(line) {
            Ok(mut entry) => {
                if entry.t.is_none() {
                    entry.t = Some(Priority::Info.as_tag().to_string());
                }
                Some(entry)
            }
            Err(_) => {
                invalid += 1;
                if invalid <= 3 {
                    warn!(line = idx + 1, "invalid ledger line skipped");
                }
                None
            }
        })
        .collect();

    if invalid > 3 {
        warn!(count = invalid, "invalid ledger lines skipped in total");
    }

    entries
}

/// Validate and append one entry. Rejection is logged, never an error for
/// the caller: a refused note must not fail the workflow that produced it.
pub fn append(knowledge_path: &Path, mut entry: KnowledgeEntry, config: &KnowledgeConfig) -> bool {
    if let Some(reason) = rejection_reason(&entry, config) {
        debug!(reason, "ledger entry rejected");
        return false;
    }

    if entry.ts.is_none() {
        entry.ts = Some(Utc::now().to_rfc3339());
    }

    let line = match serde_json::to_string(&entry) {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, "failed to serialize ledger entry");
            return false;
        }
    };

    let result = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(knowledge_path)
        .and_then(|mut file| writeln!(file, "{}", line));

    match result {
        Ok(()) => true,
        Err(e) => {
            error!(path = %knowledge_path.display(), error = %e, "ledger append failed");
            false
        }
    }
}

fn rejection_reason(entry: &KnowledgeEntry, config: &KnowledgeConfig) -> Option<&'static str> {
    if entry.txt.trim().is_empty() {
        return Some("empty txt");
    }
    if entry.t.is_none() {
        return Some("missing priority tag");
    }
    if config.validation.enabled && config.validation.blocklist && DENYLIST.is_match(&entry.txt) {
        return Some("denylisted phrasing");
    }
    None
}

/// Render the ledger as a short priority-ordered summary for injection.
///
/// Buckets by tag (avoid > success > info), dedupes within each bucket by
/// content key, truncates entries to 50 characters for display, caps each
/// bucket at 10 items, then estimates tokens as rendered length / 4. Over
/// budget, one fixed fallback re-render tightens the caps to 5/5/3: a
/// two-pass fit, not a search.
pub fn compress(entries: &[KnowledgeEntry], max_tokens: i64) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let avoid = bucket(entries, Priority::Avoid);
    let success = bucket(entries, Priority::Success);
    let info = bucket(entries, Priority::Info);

    let rendered = render_buckets(&avoid, &success, &info, [10, 10, 10]);
    if rendered.is_empty() {
        return rendered;
    }

    let estimated_tokens = (rendered.len() as i64 + 3) / 4;
    if estimated_tokens > max_tokens {
        return render_buckets(&avoid, &success, &info, [5, 5, 3]);
    }
    rendered
}

/// One priority's entries in file order, deduplicated by content key
/// (keep-first).
fn bucket(entries: &[KnowledgeEntry], priority: Priority) -> Vec<&KnowledgeEntry> {
    let mut seen = std::collections::HashSet::new();
    entries
        .iter()
        .filter(|e| e.priority() == priority)
        .filter(|e| seen.insert(e.content_key()))
        .collect()
}

fn render_buckets(
    avoid: &[&KnowledgeEntry],
    success: &[&KnowledgeEntry],
    info: &[&KnowledgeEntry],
    caps: [usize; 3],
) -> String {
    let line = |entries: &[&KnowledgeEntry], cap: usize, prefix: &str| -> Option<String> {
        let items: Vec<String> = entries
            .iter()
            .take(cap)
            .map(|e| truncate_display(&e.txt))
            .filter(|t| !t.is_empty())
            .collect();
        (!items.is_empty()).then(|| format!("{} {}", prefix, items.join("|")))
    };

    [
        line(avoid, caps[0], "avoid:"),
        line(success, caps[1], "success:"),
        line(info, caps[2], "info:"),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join("\n")
}

fn truncate_display(txt: &str) -> String {
    if txt.chars().count() > 50 {
        let head: String = txt.chars().take(47).collect();
        format!("{}...", head)
    } else {
        txt.to_string()
    }
}

/// Destructive size-control rewrite.
///
/// No-op below 80 % of `max_entries` (hysteresis: near-boundary writes must
/// not trigger a rewrite each time). Dedupes by content key keeping the
/// later timestamp (unparseable timestamps are coerced to the epoch, so
/// they always lose), sorts by priority then recency, truncates to
/// `max_entries`, and replaces the ledger wholesale via atomic rename.
/// Callers serialize this behind the task lock; it must never run twice
/// concurrently on one ledger.
pub fn compact(knowledge_path: &Path, max_entries: i64) -> bool {
    if !knowledge_path.exists() {
        return false;
    }

    let entries = read_all(knowledge_path);
    let threshold = (max_entries * 4) / 5;
    if (entries.len() as i64) < threshold {
        return false;
    }

    // Keep-latest dedup by content key.
    let mut survivors: HashMap<String, KnowledgeEntry> = HashMap::new();
    for mut entry in entries {
        if entry.parsed_ts().is_none() {
            entry.ts = Some(DateTime::<Utc>::UNIX_EPOCH.to_rfc3339());
        }
        let key = entry.content_key();
        let entry_ts = entry.parsed_ts().unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let keep_new = survivors
            .get(&key)
            .map(|existing| entry_ts > existing.parsed_ts().unwrap_or(DateTime::<Utc>::UNIX_EPOCH))
            .unwrap_or(true);
        if keep_new {
            survivors.insert(key, entry);
        }
    }

    let mut compacted: Vec<KnowledgeEntry> = survivors.into_values().collect();
    compacted.sort_by(|a, b| {
        a.priority()
            .cmp(&b.priority())
            .then_with(|| b.parsed_ts().cmp(&a.parsed_ts()))
    });
    compacted.truncate(max_entries.max(0) as usize);

    let mut output = String::new();
    for entry in &compacted {
        match serde_json::to_string(entry) {
            Ok(line) => {
                output.push_str(&line);
                output.push('\n');
            }
            Err(e) => error!(error = %e, "failed to serialize entry during compaction"),
        }
    }

    match fsutil::atomic_write(knowledge_path, &output) {
        Ok(()) => true,
        Err(e) => {
            error!(path = %knowledge_path.display(), error = %e, "compaction write failed");
            false
        }
    }
}

/// Record a context handoff in the ledger so the resuming session sees it.
pub fn write_handoff_entry(
    knowledge_path: &Path,
    phase: u32,
    reason: &str,
    config: &KnowledgeConfig,
) {
    let entry = KnowledgeEntry::new(
        Priority::Success,
        format!("Handoff at phase {}: {}", phase, reason),
        "pre-compact-hook",
    );
    append(knowledge_path, entry, config);
}
