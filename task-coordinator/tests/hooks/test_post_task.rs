//! Post-completion tests: session binding and the follow-up protocol.

use super::common::*;
use task_coordinator::hooks::post_task;

fn context_of(response: &task_coordinator_sdk::HookResponse) -> Option<String> {
    response
        .hook_specific_output
        .as_ref()?
        .additional_context
        .clone()
}

#[test]
fn test_coordinator_completion_binds_unbound_lock() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);
    project.create_lock();

    let response = post_task::handle(
        &task_event("session-1", "tc-coordinator"),
        &config(),
        project.root(),
    );
    assert!(context_of(&response).unwrap().contains("bound to lock"));

    let record = project.lock().get_raw().unwrap();
    assert_eq!(record.session_id.as_deref(), Some("session-1"));
}

#[test]
fn test_coordinator_completion_on_bound_lock_is_quiet() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);
    project.create_bound_lock("session-1");

    let response = post_task::handle(
        &task_event("session-1", "tc-coordinator"),
        &config(),
        project.root(),
    );
    assert!(response.hook_specific_output.is_none());
}

#[test]
fn test_namespaced_coordinator_name_recognized() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);
    project.create_lock();

    post_task::handle(
        &task_event("session-1", "taskcoord:tc-coordinator"),
        &config(),
        project.root(),
    );
    assert!(project.lock().get_raw().unwrap().session_id.is_some());
}

#[test]
fn test_worker_success_gets_two_step_protocol() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);
    project.create_bound_lock("session-1");

    let response = post_task::handle(
        &task_result_event("session-1", "rust-dev", false),
        &config(),
        project.root(),
    );
    let context = context_of(&response).unwrap();
    assert!(context.contains("RUST-DEV DONE"));
    assert!(context.contains("WRITE report"));
    assert!(context.contains("CALL tc-coordinator"));
}

#[test]
fn test_worker_failure_gets_retry_protocol() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);
    project.create_bound_lock("session-1");

    let response = post_task::handle(
        &task_result_event("session-1", "rust-dev", true),
        &config(),
        project.root(),
    );
    let context = context_of(&response).unwrap();
    assert!(context.contains("RUST-DEV FAILED"));
    assert!(context.contains("Retry once"));
    assert!(context.contains("Do NOT write report"));
}

#[test]
fn test_phase_indexed_task_extends_protocol() {
    let project = TestProject::with_task("status: in_progress\ncurrent_phase: 1\ntotal_phases: 3\n");
    std::fs::create_dir_all(project.phases_dir()).unwrap();
    project.create_bound_lock("session-1");

    let response = post_task::handle(
        &task_result_event("session-1", "rust-dev", false),
        &config(),
        project.root(),
    );
    let context = context_of(&response).unwrap();
    assert!(context.contains("TaskUpdate"));
    assert!(context.contains("DO NOT read phases/"));
}

#[test]
fn test_unbound_lock_directs_to_coordinator_first() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);
    project.create_lock();

    let response = post_task::handle(
        &task_event("session-1", "rust-dev"),
        &config(),
        project.root(),
    );
    assert!(context_of(&response)
        .unwrap()
        .contains("call tc-coordinator"));
}

#[test]
fn test_foreign_session_gets_nothing() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);
    project.create_bound_lock("session-1");

    let response = post_task::handle(
        &task_event("session-2", "rust-dev"),
        &config(),
        project.root(),
    );
    assert_eq!(serde_json::to_string(&response).unwrap(), "{}");
}

#[test]
fn test_system_agent_gets_nothing() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);
    project.create_bound_lock("session-1");

    let response = post_task::handle(
        &task_event("session-1", "general-purpose"),
        &config(),
        project.root(),
    );
    assert_eq!(serde_json::to_string(&response).unwrap(), "{}");
}

#[test]
fn test_no_lock_means_no_protocol() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);

    let response = post_task::handle(
        &task_event("session-1", "rust-dev"),
        &config(),
        project.root(),
    );
    assert_eq!(serde_json::to_string(&response).unwrap(), "{}");
}
