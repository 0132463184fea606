//! Allowlist matching for canonical paths.

use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::path::PathResolver;

/// Path segments that are always denied, whatever `allow_paths` says.
/// Compared case-insensitively.
pub const BLOCKED_SEGMENTS: &[&str] = &[".git", ".env", "node_modules"];

/// Kind of access requested for a path.
///
/// All three kinds currently share one allowlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathOp {
    Read,
    Write,
    List,
}

/// One entry of `allow_paths`, resolved once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedPathEntry {
    pub canonical_path: PathBuf,
    pub is_directory: bool,
}

/// Decides whether a canonical path is permitted.
///
/// Holds an immutable snapshot of the allowed entries; a policy change
/// means building a new matcher.
#[derive(Debug, Clone)]
pub struct AllowlistMatcher {
    base_dir: PathBuf,
    entries: Vec<AllowedPathEntry>,
    case_insensitive: bool,
}

impl AllowlistMatcher {
    /// Resolves each `allow_paths` string through `resolver`. Entries that
    /// fail to resolve are dropped with a warning. An entry that does not
    /// exist yet is treated as a file.
    pub fn new(resolver: &PathResolver, allow_paths: &[String], case_insensitive: bool) -> Self {
        let entries = allow_paths
            .iter()
            .filter_map(|raw| match resolver.resolve(raw) {
                Ok(canonical_path) => {
                    let is_directory = canonical_path.is_dir();
                    Some(AllowedPathEntry {
                        canonical_path,
                        is_directory,
                    })
                }
                Err(e) => {
                    warn!("Ignoring allow_paths entry '{raw}': {}", e.message);
                    None
                }
            })
            .collect();

        Self {
            base_dir: resolver.base_dir().to_path_buf(),
            entries,
            case_insensitive,
        }
    }

    pub fn entries(&self) -> &[AllowedPathEntry] {
        &self.entries
    }

    /// True if any segment below the base directory is a blocked name.
    pub fn is_blocked(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.base_dir).unwrap_or(path);
        relative.components().any(|component| match component {
            Component::Normal(part) => {
                let part = part.to_string_lossy().to_lowercase();
                BLOCKED_SEGMENTS.iter().any(|blocked| part == *blocked)
            }
            _ => false,
        })
    }

    pub fn is_allowed(&self, path: &Path, op: PathOp) -> bool {
        if self.is_blocked(path) {
            debug!("Denied {op:?} on {}: blocked segment", path.display());
            return false;
        }

        if self.entries.is_empty() {
            return false;
        }

        let target = self.fold(&path.to_string_lossy());
        self.entries.iter().any(|entry| {
            let allowed = self.fold(&entry.canonical_path.to_string_lossy());
            if entry.is_directory {
                target == allowed
                    || target
                        .strip_prefix(allowed.as_str())
                        .is_some_and(|rest| rest.starts_with(MAIN_SEPARATOR))
            } else {
                target == allowed
            }
        })
    }

    fn fold(&self, s: &str) -> String {
        if self.case_insensitive {
            s.to_lowercase()
        } else {
            s.to_string()
        }
    }
}
