//! Project-level configuration.
//!
//! A small JSON file merged field-wise over built-in defaults. Invalid
//! numeric values are clamped back to the defaults with a warning: a broken
//! config must never stop a hook from answering. The loaded object is
//! constructed once per invocation at the entry boundary and threaded as an
//! argument; nothing here is cached in process-wide state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Relative path of the user config file.
pub const CONFIG_FILE: &str = ".claude/tasks/cfg/taskcoord.config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordConfig {
    pub knowledge: KnowledgeConfig,
    pub logging: LoggingConfig,
    pub agents: AgentsConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Ledger size cap enforced by compaction.
    pub max_entries: i64,

    /// Approximate token budget for the injected knowledge summary.
    pub max_tokens: i64,

    pub validation: ValidationConfig,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            max_tokens: 500,
            validation: ValidationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub enabled: bool,

    /// Reject low-information entries (status chatter) at write time.
    pub blocklist: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            blocklist: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// error | warn | info | debug | trace
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    /// Agents that belong to the coordination machinery itself. They never
    /// receive knowledge injection and never trigger the post-completion
    /// protocol. User entries are unioned with this list, not replacing it.
    pub system: Vec<String>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            system: default_system_agents(),
        }
    }
}

fn default_system_agents() -> Vec<String> {
    [
        "tc-coordinator",
        "tc-knowledge-manager",
        "taskcoord:tc-coordinator",
        "taskcoord:tc-knowledge-manager",
        "Explore",
        "Plan",
        "Bash",
        "general-purpose",
        "claude-code-guide",
        "skill-creator",
        "agent-creator",
        "statusline-setup",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Auto-start the search watcher on session start.
    pub auto_start: bool,

    /// Timeout for the embedding-backend health probe.
    pub probe_timeout_ms: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            auto_start: true,
            probe_timeout_ms: 1500,
        }
    }
}

impl CoordConfig {
    pub fn config_path(root: &Path) -> PathBuf {
        root.join(CONFIG_FILE)
    }

    /// Load the project config, merged over defaults.
    ///
    /// Never fails: an unreadable or unparseable file falls back to the
    /// defaults, and out-of-range numerics are clamped. Warnings are
    /// returned rather than logged because the subscriber is usually not
    /// installed yet when the config is loaded.
    pub fn load(root: &Path) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();
        let path = Self::config_path(root);

        let mut config = if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str::<CoordConfig>(&content) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        warnings.push(format!(
                            "invalid config {}: {} (using defaults)",
                            path.display(),
                            e
                        ));
                        CoordConfig::default()
                    }
                },
                Err(e) => {
                    warnings.push(format!(
                        "failed to read {}: {} (using defaults)",
                        path.display(),
                        e
                    ));
                    CoordConfig::default()
                }
            }
        } else {
            CoordConfig::default()
        };

        config.merge_system_agents();
        config.clamp(&mut warnings);
        (config, warnings)
    }

    /// User-provided system agents extend the built-in list.
    fn merge_system_agents(&mut self) {
        for agent in default_system_agents() {
            if !self.agents.system.contains(&agent) {
                self.agents.system.push(agent);
            }
        }
    }

    /// Clamp invalid numeric fields back to their defaults.
    fn clamp(&mut self, warnings: &mut Vec<String>) {
        let defaults = KnowledgeConfig::default();
        if self.knowledge.max_entries < 1 {
            warnings.push(format!(
                "invalid knowledge.max_entries={}, using default {}",
                self.knowledge.max_entries, defaults.max_entries
            ));
            self.knowledge.max_entries = defaults.max_entries;
        }
        if self.knowledge.max_tokens < 1 {
            warnings.push(format!(
                "invalid knowledge.max_tokens={}, using default {}",
                self.knowledge.max_tokens, defaults.max_tokens
            ));
            self.knowledge.max_tokens = defaults.max_tokens;
        }
        let search_defaults = SearchConfig::default();
        if self.search.probe_timeout_ms < 1 {
            warnings.push(format!(
                "invalid search.probe_timeout_ms={}, using default {}",
                self.search.probe_timeout_ms, search_defaults.probe_timeout_ms
            ));
            self.search.probe_timeout_ms = search_defaults.probe_timeout_ms;
        }
    }

    pub fn is_system_agent(&self, agent_type: &str) -> bool {
        self.agents.system.iter().any(|a| a == agent_type)
    }
}
