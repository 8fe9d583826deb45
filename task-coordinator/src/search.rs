//! Semantic code-search collaborator (`semsearch`).
//!
//! The service is external: this module only detects its marker directory,
//! probes the local embedding backend with a short timeout, checks the
//! watcher/server processes, and fire-and-forgets an auto-start of the
//! watcher. Nothing here is allowed to fail the calling hook: a dead or
//! absent service just reads as "unavailable".

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::SearchConfig;

/// Marker directory: its presence means the project uses semantic search.
pub const MARKER_DIR: &str = ".semsearch";

/// Reminder injected into agent prompts when the service is configured.
pub const SEARCH_REMINDER: &str = "semsearch: USE semantic_search FIRST for code exploration";

/// Local embedding backend probed for liveness.
const BACKEND_PROBE_URL: &str = "http://127.0.0.1:11434/api/tags";

#[derive(Debug, Clone)]
pub struct SearchStatus {
    /// One-line summary for the session annotation.
    pub message: String,

    /// Whether searches would actually work right now (index + backend +
    /// server all present).
    pub usable: bool,
}

pub fn marker_dir(root: &Path) -> PathBuf {
    root.join(MARKER_DIR)
}

pub fn is_configured(root: &Path) -> bool {
    marker_dir(root).exists()
}

/// Probe + liveness sweep, with watcher auto-start when conditions allow.
pub async fn session_status(root: &Path, config: &SearchConfig) -> SearchStatus {
    let dir = marker_dir(root);
    if !dir.exists() {
        debug!("search: not configured");
        return SearchStatus {
            message: "not configured".to_string(),
            usable: false,
        };
    }

    let index_path = dir.join("index.bin");
    let mut status: Vec<String> = Vec::new();

    let backend_running = probe_backend(config.probe_timeout_ms).await;
    debug!(running = backend_running, "search: backend probe");
    if !backend_running {
        status.push("backend: stopped".to_string());
    }

    let has_index = index_path.exists();
    let index_status = has_index.then(|| describe_index(&index_path));
    if !has_index {
        status.push("index: missing".to_string());
    }

    let watch_running = process_alive(&dir.join("watch.pid"), "semsearch watch").await;
    let serve_running = process_alive(&dir.join("serve.pid"), "semsearch serve").await;
    if !serve_running {
        status.push("serve: stopped".to_string());
    }

    if !watch_running && has_index && backend_running {
        if config.auto_start {
            start_watcher(root, &dir);
            status.push("watch: starting".to_string());
        } else {
            status.push("watch: stopped".to_string());
        }
    } else if !watch_running {
        status.push("watch: stopped".to_string());
    }

    let message = match (status.is_empty(), index_status) {
        (true, Some(index)) => format!("ready | index: {}", index),
        (true, None) => "ready".to_string(),
        (false, Some(index)) => format!("{} | index: {}", status.join(", "), index),
        (false, None) => status.join(", "),
    };
    info!(message = %message, "search status");

    SearchStatus {
        message,
        usable: has_index && backend_running && serve_running,
    }
}

/// Rough index health from its size: ~10KB per indexed file, so anything
/// under 20KB is a near-empty index worth flagging.
fn describe_index(index_path: &Path) -> String {
    match std::fs::metadata(index_path) {
        Ok(meta) if meta.len() < 20_000 => {
            let kb = meta.len() / 1024;
            warn!(size_kb = kb, "search index is nearly empty, reindex recommended");
            format!("only {}KB", kb)
        }
        Ok(meta) if meta.len() < 100_000 => format!("{}KB", meta.len() / 1024),
        Ok(meta) => format!("{:.1}MB", meta.len() as f64 / (1024.0 * 1024.0)),
        Err(e) => {
            warn!(error = %e, "search index stat failed");
            "error".to_string()
        }
    }
}

/// Short-timeout HTTP probe. Any failure, including the timeout, means
/// "unavailable": never an error.
async fn probe_backend(timeout_ms: i64) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms.max(1) as u64))
        .build()
    {
        Ok(c) => c,
        Err(_) => return false,
    };
    match client.get(BACKEND_PROBE_URL).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

/// Liveness via the service's pid file, falling back to a process-table
/// scan. Both checks are best-effort and unix-only.
#[cfg(unix)]
async fn process_alive(pid_file: &Path, pattern: &str) -> bool {
    if let Ok(content) = std::fs::read_to_string(pid_file) {
        let pid = content.trim();
        if !pid.is_empty() && pid.chars().all(|c| c.is_ascii_digit()) {
            if signal_zero(pid).await {
                return true;
            }
            // Stale pid file; fall through to the process-table scan.
        }
    }

    match Command::new("pgrep").args(["-f", pattern]).output().await {
        Ok(output) => output.status.success() && !output.stdout.is_empty(),
        Err(_) => false,
    }
}

#[cfg(not(unix))]
async fn process_alive(_pid_file: &Path, _pattern: &str) -> bool {
    false
}

#[cfg(unix)]
async fn signal_zero(pid: &str) -> bool {
    Command::new("kill")
        .args(["-0", pid])
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Detached fire-and-forget spawn of the watcher. A spawn failure is logged
/// and changes nothing for the caller.
fn start_watcher(root: &Path, dir: &Path) {
    let logs_dir = dir.join("logs");
    if let Err(e) = std::fs::create_dir_all(&logs_dir) {
        warn!(error = %e, "failed to create search logs dir");
        return;
    }

    let spawned = Command::new("semsearch")
        .args(["watch", "--background"])
        .arg("--log-dir")
        .arg(&logs_dir)
        .current_dir(root)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn();

    match spawned {
        Ok(_child) => info!("search watcher auto-start initiated"),
        Err(e) => warn!(error = %e, "search watcher auto-start failed"),
    }
}
