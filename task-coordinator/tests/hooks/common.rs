//! Common test utilities for hook policy tests

use std::path::{Path, PathBuf};

use task_coordinator::config::CoordConfig;
use task_coordinator::knowledge::{self, KnowledgeEntry, Priority};
use task_coordinator::lock::TaskLock;
use task_coordinator_sdk::HookEvent;
use tempfile::TempDir;

pub const TASK_REL: &str = ".claude/tasks/demo_task/PLAN.md";

/// A legacy-dialect document sitting at phase 2 of 5.
pub const IN_PROGRESS_DOC: &str = "status: in_progress\n\n\
    ## Phase 1\n- [x] scaffolding\n\n\
    ## Phase 2\n- [x] core types\n- [ ] wire protocol\n\n\
    ## Phase 3\n- [ ] persistence\n\n\
    ## Phase 4\n- [ ] integration\n\n\
    ## Phase 5\n- [ ] docs\n";

pub const FINISHED_DOC: &str = "status: finished\n\n## Phase 1\n- [x] everything\n";

/// Scratch project directory with the coordination layout.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    /// Bare project: no task reference, no lock, no ledger.
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Project with an active task document and a valid reference to it.
    pub fn with_task(doc: &str) -> Self {
        let project = Self::empty();
        let task_path = project.task_path();
        std::fs::create_dir_all(task_path.parent().unwrap()).unwrap();
        std::fs::write(&task_path, doc).unwrap();
        std::fs::write(project.root().join(".claude/TASK.md"), TASK_REL).unwrap();
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn task_path(&self) -> PathBuf {
        self.root().join(TASK_REL)
    }

    pub fn lock(&self) -> TaskLock {
        TaskLock::for_task(&self.task_path())
    }

    pub fn create_lock(&self) {
        self.lock().create(TASK_REL).unwrap();
    }

    pub fn create_bound_lock(&self, session_id: &str) {
        self.create_lock();
        assert!(self.lock().bind(session_id));
    }

    /// Lock record with a creation timestamp `hours` in the past.
    pub fn write_aged_lock(&self, hours: i64, session_id: Option<&str>) {
        let started = (chrono::Utc::now() - chrono::Duration::hours(hours)).to_rfc3339();
        let mut record = serde_json::json!({
            "task_path": TASK_REL,
            "started_at": started,
        });
        if let Some(session) = session_id {
            record["session_id"] = serde_json::json!(session);
            record["bound_at"] = serde_json::json!(started);
        }
        std::fs::write(self.lock().path(), record.to_string()).unwrap();
    }

    pub fn knowledge_path(&self) -> PathBuf {
        self.task_path().parent().unwrap().join("KNOWLEDGE.jsonl")
    }

    pub fn append_knowledge(&self, priority: Priority, txt: &str) {
        let config = CoordConfig::default();
        assert!(knowledge::append(
            &self.knowledge_path(),
            KnowledgeEntry::new(priority, txt, "test"),
            &config.knowledge,
        ));
    }

    pub fn phases_dir(&self) -> PathBuf {
        self.task_path().parent().unwrap().join("phases")
    }
}

pub fn config() -> CoordConfig {
    CoordConfig::default()
}

/// Event for a Task tool call by `agent` from `session`.
pub fn task_event(session: &str, agent: &str) -> HookEvent {
    serde_json::from_value(serde_json::json!({
        "session_id": session,
        "tool_input": { "subagent_type": agent, "prompt": "do the assigned work" },
    }))
    .unwrap()
}

/// Task tool completion event with an explicit success flag.
pub fn task_result_event(session: &str, agent: &str, is_error: bool) -> HookEvent {
    serde_json::from_value(serde_json::json!({
        "session_id": session,
        "tool_input": { "subagent_type": agent, "prompt": "do the assigned work" },
        "tool_result": { "is_error": is_error },
    }))
    .unwrap()
}

/// Event with a session id and nothing else.
pub fn bare_event(session: &str) -> HookEvent {
    serde_json::from_value(serde_json::json!({ "session_id": session })).unwrap()
}
