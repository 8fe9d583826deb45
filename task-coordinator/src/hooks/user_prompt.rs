//! User-prompt nudge.
//!
//! Prepends a skill-check reminder to substantive prompts so the model
//! evaluates its available skills before answering. Slash commands, bare
//! confirmations, and option selections pass through untouched.

use std::sync::LazyLock;

use regex::RegexSet;
use task_coordinator_sdk::{HookEvent, HookResponse};

const SKILL_CHECK_REMINDER: &str =
    "[SKILL?] Check available skills. If one matches this request, use Skill tool before responding.";

static SKIP_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)^(yes|no|y|n|ok|okay|sure|thanks|thank you|done|cancel|stop|exit|quit)$",
        r"(?i)^(continue|proceed|go ahead|approved?|confirm(ed)?|accept(ed)?)$",
        r"^\d+$",
        r"(?i)^[a-z]$",
    ])
    .unwrap()
});

pub fn handle(event: &HookEvent) -> HookResponse {
    if event.hook_event_name.as_deref() != Some("UserPromptSubmit") {
        return HookResponse::allow();
    }

    let Some(prompt) = event.prompt.as_deref() else {
        return HookResponse::allow();
    };
    let trimmed = prompt.trim();
    if trimmed.is_empty() || trimmed.starts_with('/') || SKIP_PATTERNS.is_match(trimmed) {
        return HookResponse::allow();
    }

    HookResponse::updated_prompt(format!("{}\n\n---\n\n{}", SKILL_CHECK_REMINDER, prompt))
}
