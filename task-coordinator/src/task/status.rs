//! Task progress states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a coordinated task.
///
/// `Handoff` is a transient marker set by the pre-compact policy; it is
/// expected to return to `InProgress` once a resuming caller makes the next
/// move. The protocol records the transition but does not enforce the return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Handoff,
    Finished,
    Cancelled,
    Failed,
    Error,
}

impl TaskStatus {
    /// Parse a status line value. Unknown strings map to `Pending`, which the
    /// stop gate treats as non-terminal: the safe direction.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "pending" => Self::Pending,
            "in_progress" => Self::InProgress,
            "handoff" => Self::Handoff,
            "finished" => Self::Finished,
            "cancelled" => Self::Cancelled,
            "failed" => Self::Failed,
            "error" => Self::Error,
            _ => Self::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Finished | Self::Cancelled | Self::Failed | Self::Error
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Handoff => "handoff",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
