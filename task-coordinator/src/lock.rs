//! Exclusive-ownership lock over a task.
//!
//! One JSON record per task directory binds the task to at most one runtime
//! session. The record starts unbound (`session_id` absent) and is claimed
//! exactly once; ownership only ever transfers by deleting the record and
//! creating a new one. There is no file locking: the write → re-read →
//! verify step in [`TaskLock::bind`] is the sole mechanism that resolves a
//! binding race, so it must not be simplified to check-then-write.
//!
//! Structurally invalid records are never repaired: whichever operation
//! discovers one deletes it on sight and proceeds as if no lock existed.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::fsutil;
use crate::task::paths;

/// Locks older than this are evicted automatically.
pub const DEFAULT_STALE_HOURS: i64 = 24;

/// A validated lock record. `task_path` and `started_at` are mandatory; a
/// persisted record missing either is corrupt and gets evicted before it
/// ever reaches this type.
#[derive(Debug, Clone, Serialize)]
pub struct LockRecord {
    pub task_path: String,
    pub started_at: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bound_at: Option<String>,
}

/// On-disk shape before validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLockRecord {
    task_path: Option<String>,
    started_at: Option<String>,
    session_id: Option<String>,
    bound_at: Option<String>,
}

/// Lock operations scoped to one task.
pub struct TaskLock {
    path: PathBuf,
}

impl TaskLock {
    /// Lock for a task identified by its (absolute) document path.
    pub fn for_task(task_path: &Path) -> Self {
        Self {
            path: paths::lock_path(task_path),
        }
    }

    /// Lock for the project's active task, resolved through the task
    /// reference. `None` when no task is active.
    pub fn for_project(root: &Path) -> Option<Self> {
        paths::active_task_path(root).map(|task_path| Self::for_task(&task_path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an unbound lock record. Filesystem errors propagate; this is
    /// the one lock operation whose failure the caller must see.
    pub fn create(&self, task_rel_path: &str) -> Result<LockRecord> {
        let record = LockRecord {
            task_path: task_rel_path.to_string(),
            started_at: Utc::now().to_rfc3339(),
            session_id: None,
            bound_at: None,
        };
        self.write(&record)
            .with_context(|| format!("failed to create lock at {}", self.path.display()))?;
        Ok(record)
    }

    /// Read the record regardless of session identity.
    ///
    /// Distinguishes "absent" (`None`) from "exists" for callers that need
    /// to tell an unbound lock apart from no lock at all. Corrupt records
    /// are deleted as a side effect and reported as absent.
    pub fn get_raw(&self) -> Option<LockRecord> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "failed to read lock");
                return None;
            }
        };

        let raw: RawLockRecord = match serde_json::from_str(&content) {
            Ok(r) => r,
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "unparseable lock: deleting");
                self.delete();
                return None;
            }
        };

        let (Some(task_path), Some(started_at)) = (raw.task_path, raw.started_at) else {
            error!(path = %self.path.display(), "corrupt lock (missing task_path or started_at): deleting");
            self.delete();
            return None;
        };

        if !paths::validate_task_path(&task_path) {
            error!(path = %self.path.display(), task_path = %task_path, "corrupt lock (unsafe task_path): deleting");
            self.delete();
            return None;
        }

        Some(LockRecord {
            task_path,
            started_at,
            session_id: raw.session_id,
            bound_at: raw.bound_at,
        })
    }

    /// The record, only if it is bound to exactly this session.
    pub fn check(&self, session_id: &str) -> Option<LockRecord> {
        let record = self.get_raw()?;
        match record.session_id.as_deref() {
            None => {
                debug!("lock has no session bound");
                None
            }
            Some(bound) if bound != session_id => {
                debug!(bound = short_id(bound), current = short_id(session_id), "session mismatch");
                None
            }
            Some(_) => Some(record),
        }
    }

    /// Claim the unbound lock for `session_id`.
    ///
    /// Optimistic: the write succeeds locally for every racing session, so
    /// after writing we re-read and only the session whose id survived the
    /// race reports success. Rebinding with the already-bound id is a no-op
    /// `true`; any other id is rejected with the record unchanged.
    pub fn bind(&self, session_id: &str) -> bool {
        let Some(mut record) = self.get_raw() else {
            return false;
        };

        match record.session_id.as_deref() {
            Some(bound) if bound == session_id => return true,
            Some(_) => return false,
            None => {}
        }

        record.session_id = Some(session_id.to_string());
        record.bound_at = Some(Utc::now().to_rfc3339());
        if let Err(e) = self.write(&record) {
            error!(error = %e, "failed to bind session");
            return false;
        }

        // The verification read is what decides the race: our own write
        // "succeeded" either way, but only one value is on disk now.
        match self.get_raw() {
            Some(verify) if verify.session_id.as_deref() == Some(session_id) => {
                debug!(session = short_id(session_id), "session bound");
                true
            }
            _ => {
                warn!(session = short_id(session_id), "lost bind race, another session bound first");
                false
            }
        }
    }

    /// Idempotent removal. Failures are logged, never propagated: an
    /// undeletable lock must not wedge the caller.
    pub fn delete(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "lock deleted"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => error!(path = %self.path.display(), error = %e, "failed to delete lock"),
        }
    }

    fn write(&self, record: &LockRecord) -> Result<()> {
        let content = serde_json::to_string_pretty(record)?;
        fsutil::atomic_write(&self.path, &content)?;
        Ok(())
    }
}

/// Whether a lock has outlived the staleness threshold.
///
/// Measured from `bound_at` when bound, else `started_at`. An unparseable
/// timestamp counts as stale: fail toward eviction, not toward trusting a
/// record nobody can date.
pub fn is_stale(record: &LockRecord, threshold_hours: i64) -> bool {
    let timestamp = record.bound_at.as_deref().unwrap_or(&record.started_at);
    let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) else {
        return true;
    };
    let age = Utc::now().signed_duration_since(parsed.with_timezone(&Utc));
    age > Duration::hours(threshold_hours)
}

fn short_id(session_id: &str) -> &str {
    session_id.get(..8).unwrap_or(session_id)
}
