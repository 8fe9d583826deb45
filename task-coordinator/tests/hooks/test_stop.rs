//! Stop gate tests: ownership, eviction, and the blocking directive.

use super::common::*;
use task_coordinator::hooks::stop;
use task_coordinator_sdk::HookEvent;

#[test]
fn test_empty_project_allows_stop() {
    let project = TestProject::empty();
    let response = stop::handle(&bare_event("session-1"), &config(), project.root());
    assert_eq!(serde_json::to_string(&response).unwrap(), "{}");
}

#[test]
fn test_task_without_lock_allows_stop() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);
    let response = stop::handle(&bare_event("session-1"), &config(), project.root());
    assert!(response.decision.is_none());
}

#[test]
fn test_unbound_lock_evicted_and_stop_allowed() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);
    project.create_lock();

    let response = stop::handle(&bare_event("session-1"), &config(), project.root());
    assert!(response.decision.is_none());
    assert!(!project.lock().path().exists());
}

#[test]
fn test_foreign_session_allows_stop_silently() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);
    project.create_bound_lock("session-1");

    let response = stop::handle(&bare_event("session-2"), &config(), project.root());
    assert!(response.decision.is_none());
    assert!(response.system_message.is_none());
    // The other session's lock stays put.
    assert!(project.lock().path().exists());
}

#[test]
fn test_owned_unfinished_task_blocks_with_phase() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);
    project.create_bound_lock("session-1");

    let response = stop::handle(&bare_event("session-1"), &config(), project.root());
    assert_eq!(response.decision.as_deref(), Some("block"));

    let reason = response.reason.unwrap();
    assert!(reason.contains("phase 2/5"));
    assert!(reason.contains("Emergency exit"));

    let context = response
        .hook_specific_output
        .unwrap()
        .additional_context
        .unwrap();
    assert!(context.contains("phase 2"));
    assert!(context.contains(TASK_REL));
}

#[test]
fn test_terminal_status_deletes_lock_and_allows() {
    let project = TestProject::with_task(FINISHED_DOC);
    project.create_bound_lock("session-1");

    let response = stop::handle(&bare_event("session-1"), &config(), project.root());
    assert!(response.decision.is_none());
    assert!(!project.lock().path().exists());
}

#[test]
fn test_cancelled_status_is_terminal_too() {
    let project = TestProject::with_task("status: cancelled\n\n## Phase 1\n- [ ] abandoned\n");
    project.create_bound_lock("session-1");

    let response = stop::handle(&bare_event("session-1"), &config(), project.root());
    assert!(response.decision.is_none());
    assert!(!project.lock().path().exists());
}

#[test]
fn test_stale_lock_evicted_regardless_of_status() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);
    project.write_aged_lock(30, Some("session-1"));

    // Even the owning session gets through once the lock has gone stale.
    let response = stop::handle(&bare_event("session-1"), &config(), project.root());
    assert!(response.decision.is_none());
    assert!(!project.lock().path().exists());
}

#[test]
fn test_reentrant_stop_short_circuits() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);
    project.create_bound_lock("session-1");

    let event: HookEvent = serde_json::from_value(serde_json::json!({
        "session_id": "session-1",
        "stop_hook_active": true,
    }))
    .unwrap();

    let response = stop::handle(&event, &config(), project.root());
    assert!(response.decision.is_none());
    // The lock survives: the task is still unfinished, only the loop is cut.
    assert!(project.lock().path().exists());
}

#[test]
fn test_unreadable_task_document_evicts_and_allows() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);
    project.create_bound_lock("session-1");
    std::fs::remove_file(project.task_path()).unwrap();

    // The reference now dangles, so no lock is reachable for this project.
    let response = stop::handle(&bare_event("session-1"), &config(), project.root());
    assert!(response.decision.is_none());
}
