//! Session-start annotation tests.

use super::common::*;
use task_coordinator::config::CoordConfig;
use task_coordinator::hooks::session_start;
use task_coordinator_sdk::HookEvent;

fn quiet_config() -> CoordConfig {
    // Keep the probe fast and skip the watcher spawn in tests.
    let mut config = CoordConfig::default();
    config.search.auto_start = false;
    config.search.probe_timeout_ms = 50;
    config
}

fn start_event(session: &str, source: &str) -> HookEvent {
    serde_json::from_value(serde_json::json!({
        "session_id": session,
        "source": source,
    }))
    .unwrap()
}

#[tokio::test]
async fn test_reports_session_and_search_status() {
    let project = TestProject::empty();

    let response =
        session_start::handle(&start_event("session-12345678", "startup"), &quiet_config(), project.root())
            .await;

    let message = response.system_message.unwrap();
    assert!(message.contains("session session-"));
    assert!(message.contains("semsearch: not configured"));

    let context = response
        .hook_specific_output
        .unwrap()
        .additional_context
        .unwrap();
    assert!(context.contains("taskcoord: active"));
    assert!(!context.contains("HANDOFF"));
}

#[tokio::test]
async fn test_compact_resume_adds_handoff_context() {
    let project = TestProject::with_task(IN_PROGRESS_DOC);

    let response =
        session_start::handle(&start_event("session-1", "compact"), &quiet_config(), project.root())
            .await;

    let context = response
        .hook_specific_output
        .unwrap()
        .additional_context
        .unwrap();
    assert!(context.contains("[HANDOFF after compact]"));
    assert!(context.contains("KNOWLEDGE.jsonl"));
}

#[tokio::test]
async fn test_compact_without_task_skips_handoff_context() {
    let project = TestProject::empty();

    let response =
        session_start::handle(&start_event("session-1", "compact"), &quiet_config(), project.root())
            .await;

    let context = response
        .hook_specific_output
        .unwrap()
        .additional_context
        .unwrap();
    assert!(!context.contains("HANDOFF"));
}

#[tokio::test]
async fn test_search_marker_reflected_in_status() {
    let project = TestProject::empty();
    std::fs::create_dir_all(project.root().join(".semsearch")).unwrap();

    let response =
        session_start::handle(&start_event("session-1", "startup"), &quiet_config(), project.root())
            .await;

    let message = response.system_message.unwrap();
    assert!(message.contains("index: missing"));
}
