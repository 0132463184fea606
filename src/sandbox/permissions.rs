//! Allow/deny policy loading.
//!
//! The policy is read once and never mutated. Anything short of a
//! well-formed file yields `Permissions::default()`: all four lists empty,
//! which denies every path, every command and every confirmable tool.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::path::{has_parent_segment, looks_absolute, normalize_join};

/// Environment variable pointing at a permissions file, checked first.
pub const PERMISSIONS_ENV: &str = "AGENT_SANDBOX_PERMISSIONS";

/// Default per-sandbox file name, relative to the base directory.
pub const PERMISSIONS_FILE: &str = "permissions.json";

/// Global fallback, `~` expanded at load time.
pub const GLOBAL_PERMISSIONS: &str = "~/.config/agent-sandbox/permissions.json";

/// The allow/deny policy for one sandbox instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default)]
    pub allow_paths: Vec<String>,
    #[serde(default)]
    pub allow_commands: Vec<String>,
    #[serde(default)]
    pub require_confirmation_for: Vec<String>,
    #[serde(default)]
    pub deny_tools: Vec<String>,
}

impl Permissions {
    /// Loads the policy for `base_dir` using the process environment and
    /// the global fallback location.
    pub fn load(base_dir: &Path, explicit: Option<&str>) -> Self {
        let sources = PermissionSources {
            env_override: std::env::var_os(PERMISSIONS_ENV).map(PathBuf::from),
            explicit: explicit.map(String::from),
            global: Some(PathBuf::from(shellexpand::tilde(GLOBAL_PERMISSIONS).as_ref())),
        };
        Self::load_from(base_dir, &sources)
    }

    /// Loads the policy from explicit sources. First existing file wins:
    /// environment override, explicit override (inside `base_dir`),
    /// `{base_dir}/permissions.json`, global fallback.
    pub fn load_from(base_dir: &Path, sources: &PermissionSources) -> Self {
        let Some(path) = sources.find(base_dir) else {
            warn!(
                "No permissions file found for {}, using default deny (empty policy)",
                base_dir.display()
            );
            return Self::default();
        };

        match Self::parse_file(&path) {
            Ok(permissions) => {
                info!(
                    "Permissions loaded from {} ({} paths, {} commands, {} confirm, {} denied tools)",
                    path.display(),
                    permissions.allow_paths.len(),
                    permissions.allow_commands.len(),
                    permissions.require_confirmation_for.len(),
                    permissions.deny_tools.len()
                );
                permissions
            }
            Err(e) => {
                warn!(
                    "Invalid permissions file {}: {e:#}, using default deny (empty policy)",
                    path.display()
                );
                Self::default()
            }
        }
    }

    fn parse_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let permissions: Permissions = serde_json::from_str(&content)?;
        Ok(permissions)
    }

    pub fn requires_confirmation(&self, tool: &str) -> bool {
        self.require_confirmation_for.iter().any(|t| t == tool)
    }

    pub fn is_tool_denied(&self, tool: &str) -> bool {
        self.deny_tools.iter().any(|t| t == tool)
    }
}

/// Candidate locations for the permissions file.
#[derive(Debug, Clone, Default)]
pub struct PermissionSources {
    pub env_override: Option<PathBuf>,
    pub explicit: Option<String>,
    pub global: Option<PathBuf>,
}

impl PermissionSources {
    fn find(&self, base_dir: &Path) -> Option<PathBuf> {
        if let Some(ref env_path) = self.env_override {
            if env_path.is_file() {
                return Some(env_path.clone());
            }
            debug!("Permissions override {} does not exist", env_path.display());
        }

        if let Some(ref explicit) = self.explicit {
            match explicit_within(base_dir, explicit) {
                Some(path) if path.is_file() => return Some(path),
                Some(path) => debug!("Permissions file {} does not exist", path.display()),
                None => warn!("Permissions override '{explicit}' escapes {}, ignored", base_dir.display()),
            }
        }

        let local = base_dir.join(PERMISSIONS_FILE);
        if local.is_file() {
            return Some(local);
        }

        self.global.as_ref().filter(|p| p.is_file()).cloned()
    }
}

/// Resolves an explicit override relative to `base_dir`, refusing anything
/// that leaves it (absolute paths, `..` segments, symlinked escapes).
fn explicit_within(base_dir: &Path, explicit: &str) -> Option<PathBuf> {
    if explicit.is_empty() || looks_absolute(explicit) || has_parent_segment(explicit) {
        return None;
    }
    let candidate = normalize_join(base_dir, explicit);
    match (candidate.canonicalize(), base_dir.canonicalize()) {
        (Ok(real), Ok(base)) if !real.starts_with(&base) => None,
        _ => Some(candidate),
    }
}
