//! Capability-gated execution sandbox.
//!
//! The security model is layered:
//!
//! 1. Permissions (JSON): loaded once, default deny on any problem
//! 2. Path resolution: no absolute paths, no `..`, no symlink escape
//! 3. Allowlist matching: hard-coded blocked segments, then `allow_paths`
//! 4. Command allowlist: exact first-token match before any action
//!
//! A `Sandbox` is an immutable snapshot: changing the policy means
//! building a new one. It performs no locking; share it behind an `Arc`
//! for reads or build one per concurrent request.

pub mod allowlist;
pub mod command;
pub mod path;
pub mod permissions;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::error::ToolError;

pub use allowlist::{AllowedPathEntry, AllowlistMatcher, PathOp, BLOCKED_SEGMENTS};
pub use command::{parse_shell_args, CommandSandbox, SPAWN_TIMEOUT};
pub use path::PathResolver;
pub use permissions::{PermissionSources, Permissions};

/// Construction-time options that are not part of the policy file.
#[derive(Debug, Clone, Copy, Default)]
pub struct SandboxOptions {
    /// Lower-case both sides before matching paths against `allow_paths`.
    pub case_insensitive: bool,
}

/// Path resolution plus allowlist matching for one base directory.
#[derive(Debug, Clone)]
pub struct PathGuard {
    resolver: PathResolver,
    matcher: AllowlistMatcher,
}

impl PathGuard {
    pub fn base_dir(&self) -> &Path {
        self.resolver.base_dir()
    }

    pub fn resolve(&self, requested: &str) -> Result<PathBuf, ToolError> {
        self.resolver.resolve(requested)
    }

    pub fn is_allowed(&self, canonical: &Path, op: PathOp) -> bool {
        self.matcher.is_allowed(canonical, op)
    }

    pub fn assert_allowed(&self, canonical: &Path, op: PathOp) -> Result<(), ToolError> {
        if self.matcher.is_allowed(canonical, op) {
            Ok(())
        } else {
            let shown = canonical
                .strip_prefix(self.base_dir())
                .unwrap_or(canonical)
                .display()
                .to_string();
            warn!("Denied {op:?} on {shown}");
            Err(ToolError::denied_path(if shown.is_empty() { ".".to_string() } else { shown }))
        }
    }

    pub fn resolve_allowed(&self, requested: &str, op: PathOp) -> Result<PathBuf, ToolError> {
        let canonical = self.resolve(requested)?;
        if !self.matcher.is_allowed(&canonical, op) {
            warn!("Denied {op:?} on '{requested}'");
            return Err(ToolError::denied_path(requested));
        }
        Ok(canonical)
    }
}

/// The sandbox for one base directory and one permissions snapshot.
#[derive(Debug, Clone)]
pub struct Sandbox {
    permissions: Permissions,
    paths: PathGuard,
    commands: CommandSandbox,
}

impl Sandbox {
    /// Builds the sandbox. `base_dir` must exist; it is canonicalized and
    /// every `allow_paths` entry is resolved against it once.
    pub fn new(base_dir: &Path, permissions: Permissions, options: SandboxOptions) -> Result<Self> {
        let base_dir = base_dir
            .canonicalize()
            .with_context(|| format!("sandbox base directory {} is not accessible", base_dir.display()))?;

        let resolver = PathResolver::new(base_dir);
        let matcher =
            AllowlistMatcher::new(&resolver, &permissions.allow_paths, options.case_insensitive);
        let commands = CommandSandbox::new(permissions.allow_commands.clone());

        info!(
            "Sandbox ready at {} ({} allowed path entries, {} allowed commands, case-{})",
            resolver.base_dir().display(),
            matcher.entries().len(),
            permissions.allow_commands.len(),
            if options.case_insensitive { "insensitive" } else { "sensitive" }
        );

        Ok(Self {
            permissions,
            paths: PathGuard { resolver, matcher },
            commands,
        })
    }

    /// Overrides the spawn timeout (defaults to `SPAWN_TIMEOUT`).
    pub fn with_spawn_timeout(mut self, timeout: Duration) -> Self {
        self.commands = self.commands.with_spawn_timeout(timeout);
        self
    }

    pub fn permissions(&self) -> &Permissions {
        &self.permissions
    }

    pub fn base_dir(&self) -> &Path {
        self.paths.base_dir()
    }

    pub fn paths(&self) -> &PathGuard {
        &self.paths
    }

    pub fn resolve(&self, requested: &str) -> Result<PathBuf, ToolError> {
        self.paths.resolve(requested)
    }

    pub fn is_allowed(&self, canonical: &Path, op: PathOp) -> bool {
        self.paths.is_allowed(canonical, op)
    }

    pub fn assert_allowed(&self, canonical: &Path, op: PathOp) -> Result<(), ToolError> {
        self.paths.assert_allowed(canonical, op)
    }

    pub fn resolve_allowed(&self, requested: &str, op: PathOp) -> Result<PathBuf, ToolError> {
        self.paths.resolve_allowed(requested, op)
    }

    pub async fn run_allowed(&self, command_text: &str) -> Result<String, ToolError> {
        self.commands.run(command_text, &self.paths).await
    }
}
