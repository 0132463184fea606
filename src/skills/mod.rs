pub mod builtin;
pub mod registry;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ToolError;
use crate::sandbox::{PathOp, Sandbox};

/// Request-scoped capabilities handed to a skill.
///
/// This is the skill's only route to the filesystem and the process
/// table: path resolution, allowlist assertion and allowlisted command
/// execution. Every method returns a structured `ToolError` on denial.
#[derive(Clone)]
pub struct SkillContext {
    sandbox: Arc<Sandbox>,
    agent: Option<String>,
}

impl SkillContext {
    pub(crate) fn new(sandbox: Arc<Sandbox>, agent: Option<String>) -> Self {
        Self { sandbox, agent }
    }

    /// Name of the invoking agent, if any. Skills use it to scope their
    /// state per caller.
    pub fn agent(&self) -> Option<&str> {
        self.agent.as_deref()
    }

    /// The sandbox root, for display purposes only.
    pub fn base_dir(&self) -> &Path {
        self.sandbox.base_dir()
    }

    pub fn resolve(&self, requested: &str) -> Result<PathBuf, ToolError> {
        self.sandbox.resolve(requested)
    }

    pub fn assert_allowed(&self, canonical: &Path, op: PathOp) -> Result<(), ToolError> {
        self.sandbox.assert_allowed(canonical, op)
    }

    pub fn resolve_allowed(&self, requested: &str, op: PathOp) -> Result<PathBuf, ToolError> {
        self.sandbox.resolve_allowed(requested, op)
    }

    pub async fn run_allowed(&self, command_text: &str) -> Result<String, ToolError> {
        self.sandbox.run_allowed(command_text).await
    }
}

/// A tool that the gate can dispatch to.
///
/// All builtin tools implement this trait. The gate calls `execute()`
/// only after every permission check has passed.
#[async_trait]
pub trait Skill: Send + Sync {
    /// Unique identifier used in tool calls and in the permissions file.
    /// Must be lowercase alphanumeric + underscores (e.g. "read_file").
    fn name(&self) -> &str;

    /// Human-readable description of what the tool does.
    fn description(&self) -> &str;

    /// JSON Schema describing the parameters this skill accepts.
    /// The gate checks `required` and primitive `type`s before dispatch.
    fn parameters_schema(&self) -> Value;

    /// Declarative capability strings, e.g. "filesystem:read".
    fn capabilities(&self) -> Vec<String> {
        vec![]
    }

    /// Execute the skill with validated parameters.
    async fn execute(&self, params: Value, context: &SkillContext) -> Result<Value, ToolError>;
}

pub use registry::SkillRegistry;
