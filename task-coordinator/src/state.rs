//! Last-handoff bookkeeping.
//!
//! A single JSON object replaced wholesale on every update: no merge
//! semantics. Read and write failures degrade to the empty state; this
//! record is advisory and must never block a policy.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::fsutil;

/// Relative path of the state blob.
pub const STATE_FILE: &str = ".claude/tasks/cfg/taskcoord.state.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_handoff: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_phase: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_compact_at: Option<String>,
}

pub fn state_path(root: &Path) -> PathBuf {
    root.join(STATE_FILE)
}

pub fn load(root: &Path) -> CoordState {
    let path = state_path(root);
    match std::fs::read_to_string(&path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "unparseable state, starting fresh");
            CoordState::default()
        }),
        Err(_) => CoordState::default(),
    }
}

pub fn save(root: &Path, state: &CoordState) {
    let path = state_path(root);
    let content = match serde_json::to_string_pretty(state) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "failed to serialize state");
            return;
        }
    };
    if let Err(e) = fsutil::atomic_write(&path, &content) {
        warn!(path = %path.display(), error = %e, "failed to save state");
    }
}
