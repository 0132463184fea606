//! Path resolution against the sandbox base directory.
//!
//! Defense layers, in order:
//!
//! 1. String-level rejection (empty, absolute, any `..` segment) before
//!    touching the filesystem
//! 2. Lexical containment of the joined candidate under `base_dir`
//! 3. Canonical containment: the real, symlink-free form of the candidate
//!    (or of its nearest existing ancestor for paths that do not exist yet)
//!    must still lie under the canonical `base_dir`

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::ToolError;

/// Joins `relative` onto `base`, dropping `.` and empty components.
///
/// Callers must have rejected `..` and absolute inputs already; any
/// remaining non-normal component is skipped.
pub(crate) fn normalize_join(base: &Path, relative: &str) -> PathBuf {
    let mut out = base.to_path_buf();
    for component in Path::new(relative).components() {
        if let Component::Normal(part) = component {
            out.push(part);
        }
    }
    out
}

/// Returns true if any `/`- or `\`-separated segment is `..`.
pub(crate) fn has_parent_segment(requested: &str) -> bool {
    requested.split(['/', '\\']).any(|seg| seg == "..")
}

/// Absolute on any platform: rooted, drive-prefixed or UNC-like.
pub(crate) fn looks_absolute(requested: &str) -> bool {
    Path::new(requested).is_absolute()
        || requested.starts_with('/')
        || requested.starts_with('\\')
        || requested.chars().nth(1) == Some(':')
}

/// Resolves untrusted relative paths to canonical absolute paths inside
/// a fixed base directory.
#[derive(Debug, Clone)]
pub struct PathResolver {
    base_dir: PathBuf,
}

impl PathResolver {
    /// `base_dir` must already be canonical (see `Sandbox::new`).
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn within_base(&self, path: &Path) -> bool {
        path == self.base_dir || path.starts_with(&self.base_dir)
    }

    /// Resolves `requested` or returns a `DENIED_PATH_ALLOWLIST` error
    /// naming it.
    pub fn resolve(&self, requested: &str) -> Result<PathBuf, ToolError> {
        if requested.is_empty() || looks_absolute(requested) || has_parent_segment(requested) {
            debug!("Rejected path '{requested}' (empty, absolute or traversal)");
            return Err(ToolError::denied_path(requested));
        }

        let candidate = normalize_join(&self.base_dir, requested);
        if !self.within_base(&candidate) {
            return Err(ToolError::denied_path(requested));
        }

        let resolved = match std::fs::symlink_metadata(&candidate) {
            // Exists (possibly as a dangling symlink): canonicalize the path
            // itself; a dangling link cannot be verified and is denied.
            Ok(_) => candidate.canonicalize().map_err(|e| {
                debug!("Cannot canonicalize '{requested}': {e}");
                ToolError::denied_path(requested)
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => self.resolve_missing(&candidate, requested)?,
            Err(e) => {
                debug!("Cannot inspect '{requested}': {e}");
                return Err(ToolError::denied_path(requested));
            }
        };

        if !self.within_base(&resolved) {
            debug!(
                "Path '{requested}' resolves to {} outside the sandbox",
                resolved.display()
            );
            return Err(ToolError::denied_path(requested));
        }

        Ok(resolved)
    }

    /// Canonicalizes the nearest existing ancestor of a path that does not
    /// exist yet and re-appends the missing suffix.
    fn resolve_missing(&self, candidate: &Path, requested: &str) -> Result<PathBuf, ToolError> {
        let mut suffix = Vec::new();
        let mut cursor = candidate;

        loop {
            match std::fs::symlink_metadata(cursor) {
                Ok(_) => break,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(_) => return Err(ToolError::denied_path(requested)),
            }
            if let Some(name) = cursor.file_name() {
                suffix.push(name.to_os_string());
            }
            cursor = match cursor.parent() {
                Some(parent) => parent,
                // Nothing on the way up exists: containment was already
                // checked lexically.
                None => return Ok(candidate.to_path_buf()),
            };
        }

        let mut resolved = cursor
            .canonicalize()
            .map_err(|_| ToolError::denied_path(requested))?;
        for part in suffix.iter().rev() {
            resolved.push(part);
        }
        Ok(resolved)
    }
}
