//! Hook entry point.
//!
//! The runtime invokes one hook subcommand per lifecycle event, piping the
//! event record to stdin. The decision record goes to stdout; logs go to
//! stderr. Hook invocations always exit 0: coordination must never be the
//! reason a caller's workflow breaks, so every failure degrades to the
//! neutral `{}` decision. The `start` subcommand is the one human-facing
//! command: it activates a task and creates its unbound lock.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use task_coordinator_sdk::{HookEvent, HookResponse};
use tokio::io::AsyncReadExt;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use task_coordinator::config::CoordConfig;
use task_coordinator::fsutil;
use task_coordinator::hooks;
use task_coordinator::lock::{self, TaskLock, DEFAULT_STALE_HOURS};
use task_coordinator::task::paths;

/// Task coordination hooks for multi-agent work on a shared project
///
/// Each hook subcommand handles one runtime lifecycle event: it reads the
/// event JSON from stdin, consults the project's task lock, document, and
/// knowledge ledger, and prints a decision JSON to stdout.
#[derive(Parser, Debug)]
#[command(name = "task-coordinator")]
#[command(about = "Task coordination hooks for multi-agent work")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// PreToolUse gate for Task dispatch (lock check + prompt enrichment)
    PreTask,

    /// PostToolUse follow-up (session binding + completion protocol)
    PostTask,

    /// Stop gate (blocks while the owned task is unfinished)
    Stop,

    /// PreCompact handoff (ledger compaction + status snapshot)
    PreCompact,

    /// SessionStart annotation (search status + resume context)
    SessionStart,

    /// UserPromptSubmit nudge (skill-check reminder)
    UserPrompt,

    /// Activate a task: write the active-task reference and create its lock
    Start {
        /// Relative task document path (.claude/tasks/<name>_task/PLAN.md)
        #[arg(long, value_name = "PATH")]
        task: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Command::Start { task } = &cli.command {
        std::process::exit(run_start(task));
    }

    let response = run_hook(cli.command).await;
    let json = serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string());
    println!("{}", json);
}

async fn run_hook(command: Command) -> HookResponse {
    let mut input = String::new();
    if tokio::io::stdin().read_to_string(&mut input).await.is_err() {
        eprintln!("[task-coordinator] failed to read stdin");
        return HookResponse::allow();
    }

    // Malformed transport input short-circuits to the neutral decision.
    let event: HookEvent = match serde_json::from_str(&input) {
        Ok(event) => event,
        Err(e) => {
            eprintln!("[task-coordinator] invalid event payload: {}", e);
            return HookResponse::allow();
        }
    };

    let root = event
        .cwd
        .clone()
        .map(PathBuf::from)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = load_config(&root);

    match command {
        Command::PreTask => hooks::pre_task::handle(&event, &config, &root),
        Command::PostTask => hooks::post_task::handle(&event, &config, &root),
        Command::Stop => hooks::stop::handle(&event, &config, &root),
        Command::PreCompact => hooks::pre_compact::handle(&event, &config, &root),
        Command::SessionStart => hooks::session_start::handle(&event, &config, &root).await,
        Command::UserPrompt => hooks::user_prompt::handle(&event),
        Command::Start { .. } => unreachable!("handled before stdin is read"),
    }
}

/// Activate `task` in the current directory: validate the path, point the
/// active-task reference at it, and create the unbound lock for the
/// coordinator to bind.
fn run_start(task: &str) -> i32 {
    let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    load_config(&root);

    if !paths::validate_task_path(task) {
        eprintln!(
            "error: task path must look like .claude/tasks/<name>_task/PLAN.md (got {})",
            task
        );
        return 2;
    }
    let task_abs = root.join(task);
    if !task_abs.exists() {
        eprintln!("error: task document not found: {}", task_abs.display());
        return 2;
    }

    let task_lock = TaskLock::for_task(&task_abs);
    if let Some(existing) = task_lock.get_raw() {
        if lock::is_stale(&existing, DEFAULT_STALE_HOURS) {
            warn!("replacing stale lock");
            task_lock.delete();
        } else {
            eprintln!(
                "error: task is already locked (session: {})",
                existing.session_id.as_deref().unwrap_or("unbound")
            );
            return 2;
        }
    }

    if let Err(e) = fsutil::atomic_write(&root.join(".claude").join("TASK.md"), task) {
        eprintln!("error: failed to write task reference: {}", e);
        return 1;
    }
    if let Err(e) = task_lock.create(task) {
        eprintln!("error: {}", e);
        return 1;
    }

    println!("task activated: {}", task);
    0
}

fn load_config(root: &Path) -> CoordConfig {
    let (config, config_warnings) = CoordConfig::load(root);
    init_tracing(&config.logging.level);
    for warning in config_warnings {
        warn!("{}", warning);
    }
    config
}

/// Level comes from config; `RUST_LOG` wins when set. Logs go to stderr so
/// stdout stays a clean decision channel.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
