use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::gate::Agent;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub agents: Vec<Agent>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SandboxConfig {
    /// Root directory every tool is confined to
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    /// Explicit permissions file, relative to `base_dir`
    #[serde(default)]
    pub permissions: Option<String>,
    /// Fold case when matching allowlisted paths
    #[serde(default = "default_case_insensitive")]
    pub case_insensitive: bool,
    /// Attach `_debug` timing to every result
    #[serde(default)]
    pub debug: bool,
    /// Hard limit for spawned (non-builtin) commands
    #[serde(default = "default_spawn_timeout_secs")]
    pub spawn_timeout_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            permissions: None,
            case_insensitive: default_case_insensitive(),
            debug: false,
            spawn_timeout_secs: default_spawn_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Relative to the process working directory, not to `base_dir`
    #[serde(default = "default_audit_path")]
    pub path: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_audit_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MemoryConfig {
    /// Knowledge store, relative to `base_dir` (must be allowlisted)
    #[serde(default = "default_memory_path")]
    pub path: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            path: default_memory_path(),
        }
    }
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_case_insensitive() -> bool {
    cfg!(any(target_os = "macos", target_os = "windows"))
}

fn default_spawn_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("./data/audit.jsonl")
}

fn default_memory_path() -> String {
    "memory/knowledge.jsonl".to_string()
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        // Expand environment variables like ${WORKSPACE_DIR}
        let expanded = shellexpand::env(&content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Like `load`, but a missing file yields defaults and a malformed
    /// one yields defaults with a warning.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!("No configuration at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Ignoring malformed configuration {}: {e:#}. Using defaults",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Looks up an agent by exact name
    pub fn find_agent(&self, name: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.name == name)
    }
}
