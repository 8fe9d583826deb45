//! Pre-dispatch tests: lock gating and prompt enrichment.

use super::common::*;
use task_coordinator::hooks::pre_task;
use task_coordinator::knowledge::Priority;
use task_coordinator_sdk::HookEvent;

fn injected_prompt(response: &task_coordinator_sdk::HookResponse) -> Option<String> {
    response
        .hook_specific_output
        .as_ref()?
        .updated_input
        .as_ref()?
        .get("prompt")?
        .as_str()
        .map(String::from)
}

#[test]
fn test_empty_project_allows_dispatch_silently() {
    let project = TestProject::empty();
    let response = pre_task::handle(&task_event("session-1", "rust-dev"), &config(), project.root());
    assert_eq!(serde_json::to_string(&response).unwrap(), "{}");
}

#[test]
fn test_unbound_lock_refuses_worker_dispatch() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);
    project.create_lock();

    let response = pre_task::handle(&task_event("session-1", "rust-dev"), &config(), project.root());
    let output = response.hook_specific_output.unwrap();
    assert_eq!(output.permission_decision.as_deref(), Some("deny"));
    assert!(output
        .permission_decision_reason
        .unwrap()
        .contains("tc-coordinator"));
}

#[test]
fn test_unbound_lock_lets_system_agent_through() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);
    project.create_lock();

    let response = pre_task::handle(&task_event("session-1", "Explore"), &config(), project.root());
    assert!(response.hook_specific_output.is_none());
}

#[test]
fn test_knowledge_injected_for_bound_session() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);
    project.create_bound_lock("session-1");
    project.append_knowledge(Priority::Avoid, "config reload races with bind");
    project.append_knowledge(Priority::Success, "atomic rename fixed partial reads");

    let response = pre_task::handle(&task_event("session-1", "rust-dev"), &config(), project.root());
    let prompt = injected_prompt(&response).unwrap();
    assert!(prompt.contains("avoid: config reload races with bind"));
    assert!(prompt.contains("success: atomic rename fixed partial reads"));
    assert!(prompt.ends_with("do the assigned work"));
}

#[test]
fn test_no_injection_for_foreign_session() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);
    project.create_bound_lock("session-1");
    project.append_knowledge(Priority::Info, "some accumulated context");

    let response = pre_task::handle(&task_event("session-2", "rust-dev"), &config(), project.root());
    assert!(response.hook_specific_output.is_none());
}

#[test]
fn test_no_injection_for_system_agent() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);
    project.create_bound_lock("session-1");
    project.append_knowledge(Priority::Info, "some accumulated context");

    let response = pre_task::handle(&task_event("session-1", "Explore"), &config(), project.root());
    assert!(response.hook_specific_output.is_none());
}

#[test]
fn test_phase_index_adds_task_context() {
    let project = TestProject::with_task("status: in_progress\ncurrent_phase: 2\ntotal_phases: 4\n");
    std::fs::create_dir_all(project.phases_dir()).unwrap();
    project.create_bound_lock("session-1");

    let response = pre_task::handle(&task_event("session-1", "rust-dev"), &config(), project.root());
    let prompt = injected_prompt(&response).unwrap();
    assert!(prompt.contains("## Task Context"));
    assert!(prompt.contains("phases/ file"));
}

#[test]
fn test_constraints_injected_by_role() {
    let doc = "status: in_progress\n\n\
        <!-- ALL -->\nnever commit directly to main\n<!-- /ALL -->\n\
        <!-- DEV -->\nrun the formatter before finishing\n<!-- /DEV -->\n\
        <!-- TEST -->\nuse the shared fixtures\n<!-- /TEST -->\n\n\
        ## Phase 1\n- [ ] work\n";
    let project = TestProject::with_task(doc);
    project.create_bound_lock("session-1");

    let response = pre_task::handle(&task_event("session-1", "backend-developer"), &config(), project.root());
    let prompt = injected_prompt(&response).unwrap();
    assert!(prompt.contains("## Task Constraints"));
    assert!(prompt.contains("never commit directly to main"));
    assert!(prompt.contains("run the formatter"));
    assert!(!prompt.contains("shared fixtures"));
}

#[test]
fn test_search_reminder_injected_when_configured() {
    let project = TestProject::empty();
    std::fs::create_dir_all(project.root().join(".semsearch")).unwrap();

    let response = pre_task::handle(&task_event("session-1", "Explore"), &config(), project.root());
    let prompt = injected_prompt(&response).unwrap();
    assert!(prompt.starts_with("semsearch:"));
}

#[test]
fn test_event_without_tool_input_is_ignored() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);
    project.create_lock();

    let event: HookEvent =
        serde_json::from_value(serde_json::json!({ "session_id": "session-1" })).unwrap();
    let response = pre_task::handle(&event, &config(), project.root());
    assert_eq!(serde_json::to_string(&response).unwrap(), "{}");
}

#[test]
fn test_event_without_agent_type_is_ignored() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);
    project.create_lock();

    let event: HookEvent = serde_json::from_value(serde_json::json!({
        "session_id": "session-1",
        "tool_input": { "prompt": "anonymous work" },
    }))
    .unwrap();
    let response = pre_task::handle(&event, &config(), project.root());
    assert_eq!(serde_json::to_string(&response).unwrap(), "{}");
}
