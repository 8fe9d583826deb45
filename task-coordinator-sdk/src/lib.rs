//! Wire contract between the host agent runtime and task-coordinator hooks.
//!
//! Every hook invocation receives one [`HookEvent`] as JSON on stdin and
//! answers with one [`HookResponse`] as JSON on stdout. The runtime owns the
//! transport; these types only pin down the shape of both records.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One lifecycle event delivered by the runtime.
///
/// Every field is defaulted: a partial or even empty payload still
/// deserializes, so hooks can degrade instead of erroring on odd input.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HookEvent {
    /// Opaque id of the runtime session that fired the event.
    pub session_id: Option<String>,

    /// Project root the event refers to.
    pub cwd: Option<String>,

    /// Runtime event name (e.g. "PreToolUse", "Stop").
    pub hook_event_name: Option<String>,

    /// Trigger source for SessionStart events ("startup", "clear", "compact").
    pub source: Option<String>,

    /// Set by the runtime when it is retrying a stop that a hook already
    /// blocked once. Hooks must short-circuit to allow.
    pub stop_hook_active: bool,

    /// Raw user prompt for UserPromptSubmit events.
    pub prompt: Option<String>,

    /// Tool call payload for PreToolUse/PostToolUse events.
    pub tool_input: Option<ToolInput>,

    /// Tool outcome for PostToolUse events.
    pub tool_result: Option<ToolResult>,
}

/// Payload of a Task tool call.
///
/// Unknown fields are preserved so an updated input can round-trip them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subagent_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Outcome flag of a completed tool call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolResult {
    pub is_error: bool,
}

/// Decision record returned to the runtime.
///
/// Every field is optional; the neutral decision serializes as `{}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HookResponse {
    /// Whether the runtime should proceed with the interrupted operation
    /// (PreCompact contract).
    #[serde(rename = "continue", skip_serializing_if = "Option::is_none")]
    pub continue_: Option<bool>,

    /// "block" to refuse the event (Stop contract).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,

    /// Human-readable directive accompanying a block decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Short status line surfaced to the user.
    #[serde(rename = "systemMessage", skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,

    /// Modified input for UserPromptSubmit events.
    #[serde(rename = "updatedInput", skip_serializing_if = "Option::is_none")]
    pub updated_input: Option<Value>,

    #[serde(
        rename = "hookSpecificOutput",
        skip_serializing_if = "Option::is_none"
    )]
    pub hook_specific_output: Option<HookSpecificOutput>,
}

/// Event-specific output channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HookSpecificOutput {
    #[serde(rename = "hookEventName")]
    pub hook_event_name: String,

    /// "allow" or "deny" for PreToolUse events.
    #[serde(
        rename = "permissionDecision",
        skip_serializing_if = "Option::is_none"
    )]
    pub permission_decision: Option<String>,

    #[serde(
        rename = "permissionDecisionReason",
        skip_serializing_if = "Option::is_none"
    )]
    pub permission_decision_reason: Option<String>,

    /// Replacement tool input for PreToolUse events.
    #[serde(rename = "updatedInput", skip_serializing_if = "Option::is_none")]
    pub updated_input: Option<Value>,

    /// Extra context injected into the model conversation.
    #[serde(
        rename = "additionalContext",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_context: Option<String>,
}

impl HookResponse {
    /// Neutral decision: no opinion, runtime proceeds as usual.
    pub fn allow() -> Self {
        Self::default()
    }

    /// Allow and let the interrupted operation proceed (PreCompact).
    pub fn proceed() -> Self {
        Self {
            continue_: Some(true),
            ..Self::default()
        }
    }

    /// Refuse the event with a directive for the caller.
    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            decision: Some("block".to_string()),
            reason: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }

    pub fn with_output(mut self, output: HookSpecificOutput) -> Self {
        self.hook_specific_output = Some(output);
        self
    }

    /// Modified user prompt for UserPromptSubmit events.
    pub fn updated_prompt(prompt: impl Into<String>) -> Self {
        Self {
            updated_input: Some(serde_json::json!({ "prompt": prompt.into() })),
            ..Self::default()
        }
    }
}

impl HookSpecificOutput {
    pub fn for_event(event_name: impl Into<String>) -> Self {
        Self {
            hook_event_name: event_name.into(),
            ..Self::default()
        }
    }

    /// PreToolUse allow decision carrying a replacement tool input.
    pub fn allow_with_input(input: &ToolInput) -> Self {
        Self {
            hook_event_name: "PreToolUse".to_string(),
            permission_decision: Some("allow".to_string()),
            updated_input: serde_json::to_value(input).ok(),
            ..Self::default()
        }
    }

    /// PreToolUse deny decision with a directive.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            hook_event_name: "PreToolUse".to_string(),
            permission_decision: Some("deny".to_string()),
            permission_decision_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Context injection without touching the tool input.
    pub fn context(event_name: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            hook_event_name: event_name.into(),
            additional_context: Some(context.into()),
            ..Self::default()
        }
    }
}
