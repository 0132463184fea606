//! The single entry point for tool calls.
//!
//! `ExecutionGate::execute` runs the permission checks in a fixed,
//! short-circuiting order, validates arguments, hands the skill a
//! request-scoped `SkillContext` and records the outcome in the audit
//! log. Every failure leaves as a structured `ToolResult`; nothing
//! escapes as a panic or a raw error.

pub mod audit;
pub mod validation;

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::error::{ErrorCode, ToolError};
use crate::sandbox::Sandbox;
use crate::skills::{SkillContext, SkillRegistry};

pub use audit::{sanitize_args, AuditEntry, AuditLog};
pub use validation::validate_args;

/// Tools that may run when no agent identity is supplied. None of them
/// touch the filesystem or spawn processes.
pub const UNSCOPED_TOOLS: &[&str] = &["echo", "get_time"];

/// Trust tier of a caller identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Bypasses the per-agent tool list (never the global deny-list).
    System,
    #[default]
    User,
    Worker,
}

/// A caller identity and the tool names it may invoke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub name: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub kind: AgentKind,
}

impl Agent {
    pub fn new(name: impl Into<String>, kind: AgentKind, tools: &[&str]) -> Self {
        Self {
            name: name.into(),
            tools: tools.iter().map(|t| t.to_string()).collect(),
            kind,
        }
    }
}

/// Tool-call envelope read from stdin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_name: String,
    #[serde(default = "empty_args")]
    pub args: Value,
}

fn empty_args() -> Value {
    json!({})
}

/// Tool-result envelope. Exactly one of `result` and `error` is set,
/// according to `ok`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    #[serde(rename = "_debug", default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<Value>,
}

impl ToolResult {
    pub fn success(result: Value) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
            debug: None,
        }
    }

    pub fn failure(error: ToolError) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(error),
            debug: None,
        }
    }

    /// Error code, if this is a failure.
    pub fn code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}

impl From<Result<Value, ToolError>> for ToolResult {
    fn from(outcome: Result<Value, ToolError>) -> Self {
        match outcome {
            Ok(value) => Self::success(value),
            Err(e) => Self::failure(e),
        }
    }
}

/// Orchestrates permission checks, validation, dispatch and audit.
pub struct ExecutionGate {
    sandbox: Arc<Sandbox>,
    registry: SkillRegistry,
    audit: Option<AuditLog>,
    debug: bool,
}

impl ExecutionGate {
    pub fn new(sandbox: Arc<Sandbox>, registry: SkillRegistry, audit: Option<AuditLog>) -> Self {
        Self {
            sandbox,
            registry,
            audit,
            debug: false,
        }
    }

    /// Attach `_debug` timing information to every result.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn registry(&self) -> &SkillRegistry {
        &self.registry
    }

    /// Runs one tool call end to end.
    pub async fn execute(&self, tool_name: &str, raw_args: Value, agent: Option<&Agent>) -> ToolResult {
        let started = Instant::now();
        let outcome = self.run(tool_name, &raw_args, agent).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            Ok(_) => info!("Tool {tool_name} succeeded in {duration_ms}ms"),
            Err(e) => info!("Tool {tool_name} failed: {e}"),
        }

        if let Some(audit) = &self.audit {
            audit.record(&AuditEntry::new(
                tool_name,
                &raw_args,
                outcome.is_ok(),
                outcome.as_ref().err().map(|e| e.message.clone()),
                Some(duration_ms),
            ));
        }

        let mut result = ToolResult::from(outcome);
        if self.debug {
            result.debug = Some(json!({
                "tool": tool_name,
                "agent": agent.map(|a| a.name.as_str()),
                "duration_ms": duration_ms,
            }));
        }
        result
    }

    async fn run(&self, tool_name: &str, raw_args: &Value, agent: Option<&Agent>) -> Result<Value, ToolError> {
        self.check_access(tool_name, agent)?;

        let skill = self.registry.get(tool_name).ok_or_else(|| {
            ToolError::new(ErrorCode::UnknownTool, format!("Unknown tool: {tool_name}"))
                .with_details(json!({ "tool": tool_name }))
        })?;

        let args = match raw_args {
            Value::Object(map) => map,
            other => {
                return Err(ToolError::validation(format!(
                    "Tool arguments must be a JSON object, got {other}"
                )))
            }
        };
        validate_args(&skill.parameters_schema(), args)?;

        let context = SkillContext::new(
            Arc::clone(&self.sandbox),
            agent.map(|a| a.name.clone()),
        );

        if self.sandbox.permissions().requires_confirmation(tool_name)
            && args.get("confirm") != Some(&Value::Bool(true))
        {
            return Err(ToolError::new(
                ErrorCode::ConfirmationRequired,
                format!("Tool '{tool_name}' requires confirmation; retry with \"confirm\": true"),
            )
            .with_details(json!({ "tool": tool_name })));
        }

        debug!("Dispatching {tool_name}");
        let params = raw_args.clone();
        let handle = tokio::spawn(async move { skill.execute(params, &context).await });
        match handle.await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                error!("Tool {tool_name} aborted: {join_error}");
                Err(ToolError::exec(format!("Tool '{tool_name}' aborted unexpectedly"))
                    .with_details(json!({ "kind": if join_error.is_panic() { "panic" } else { "cancelled" } })))
            }
        }
    }

    /// Agent scope, global deny-list and the no-agent default, in that order.
    fn check_access(&self, tool_name: &str, agent: Option<&Agent>) -> Result<(), ToolError> {
        if let Some(agent) = agent {
            if agent.kind != AgentKind::System && !agent.tools.iter().any(|t| t == tool_name) {
                return Err(ToolError::new(
                    ErrorCode::DeniedAgentToolset,
                    format!("Agent '{}' is not allowed to use tool '{tool_name}'", agent.name),
                )
                .with_details(json!({ "agent": agent.name, "tool": tool_name })));
            }
        }

        if self.sandbox.permissions().is_tool_denied(tool_name) {
            return Err(ToolError::new(
                ErrorCode::DeniedToolBlocklist,
                format!("Tool '{tool_name}' is blocked by policy"),
            )
            .with_details(json!({ "tool": tool_name })));
        }

        if agent.is_none() && !UNSCOPED_TOOLS.contains(&tool_name) {
            return Err(ToolError::new(
                ErrorCode::DeniedAgentToolset,
                format!("Tool '{tool_name}' requires an agent identity"),
            )
            .with_details(json!({ "tool": tool_name })));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::{Permissions, SandboxOptions};
    use crate::skills::Skill;
    use async_trait::async_trait;
    use std::fs;
    use std::path::Path;

    struct PanicSkill;

    #[async_trait]
    impl Skill for PanicSkill {
        fn name(&self) -> &str {
            "boom"
        }

        fn description(&self) -> &str {
            "Always panics"
        }

        fn parameters_schema(&self) -> Value {
            json!({ "type": "object", "properties": {} })
        }

        async fn execute(&self, _params: Value, _context: &SkillContext) -> Result<Value, ToolError> {
            panic!("handler bug");
        }
    }

    fn gate(dir: &Path, permissions: Permissions) -> ExecutionGate {
        let sandbox = Sandbox::new(dir, permissions, SandboxOptions::default()).unwrap();
        let mut registry = SkillRegistry::with_builtins("memory/knowledge.jsonl");
        registry.register(Arc::new(PanicSkill));
        let audit = AuditLog::new(dir.join("audit/audit.jsonl"));
        ExecutionGate::new(Arc::new(sandbox), registry, Some(audit))
    }

    fn system() -> Agent {
        Agent::new("root", AgentKind::System, &[])
    }

    #[tokio::test]
    async fn test_confirmation_required_before_side_effect() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(
            dir.path(),
            Permissions {
                allow_paths: vec!["./allowed.txt".to_string()],
                require_confirmation_for: vec!["write_file".to_string()],
                ..Default::default()
            },
        );
        let agent = system();

        let result = gate
            .execute(
                "write_file",
                json!({"path": "allowed.txt", "content": "hello"}),
                Some(&agent),
            )
            .await;
        assert!(!result.ok);
        assert_eq!(result.code(), Some(ErrorCode::ConfirmationRequired));
        assert!(!dir.path().join("allowed.txt").exists());

        let result = gate
            .execute(
                "write_file",
                json!({"path": "allowed.txt", "content": "hello", "confirm": true}),
                Some(&agent),
            )
            .await;
        assert!(result.ok, "{result:?}");
        assert_eq!(fs::read_to_string(dir.path().join("allowed.txt")).unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_confirm_must_be_boolean_true() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(
            dir.path(),
            Permissions {
                allow_paths: vec!["allowed.txt".to_string()],
                require_confirmation_for: vec!["write_file".to_string()],
                ..Default::default()
            },
        );
        let result = gate
            .execute(
                "write_file",
                json!({"path": "allowed.txt", "content": "x", "confirm": "yes"}),
                Some(&system()),
            )
            .await;
        assert_eq!(result.code(), Some(ErrorCode::ConfirmationRequired));
    }

    #[tokio::test]
    async fn test_deny_list_applies_to_system_agent() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(
            dir.path(),
            Permissions {
                deny_tools: vec!["echo".to_string()],
                ..Default::default()
            },
        );
        let result = gate.execute("echo", json!({"text": "hi"}), Some(&system())).await;
        assert_eq!(result.code(), Some(ErrorCode::DeniedToolBlocklist));

        let result = gate.execute("echo", json!({"text": "hi"}), None).await;
        assert_eq!(result.code(), Some(ErrorCode::DeniedToolBlocklist));
    }

    #[tokio::test]
    async fn test_agent_toolset_checked_first() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(
            dir.path(),
            Permissions {
                deny_tools: vec!["read_file".to_string()],
                ..Default::default()
            },
        );
        let worker = Agent::new("indexer", AgentKind::Worker, &["echo"]);

        let result = gate.execute("read_file", json!({"path": "a"}), Some(&worker)).await;
        assert_eq!(result.code(), Some(ErrorCode::DeniedAgentToolset));

        let result = gate.execute("echo", json!({"text": "ok"}), Some(&worker)).await;
        assert!(result.ok);
        assert_eq!(result.result, Some(json!("ok")));
    }

    #[tokio::test]
    async fn test_no_agent_only_pure_tools() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();
        let gate = gate(
            dir.path(),
            Permissions {
                allow_paths: vec![".".to_string()],
                ..Default::default()
            },
        );

        let result = gate.execute("read_file", json!({"path": "a.txt"}), None).await;
        assert_eq!(result.code(), Some(ErrorCode::DeniedAgentToolset));

        assert!(gate.execute("get_time", json!({}), None).await.ok);
        assert!(gate.execute("echo", json!({"text": "x"}), None).await.ok);
    }

    #[tokio::test]
    async fn test_unknown_tool_after_deny_checks() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(dir.path(), Permissions::default());

        let result = gate.execute("launch_rockets", json!({}), Some(&system())).await;
        assert_eq!(result.code(), Some(ErrorCode::UnknownTool));

        let result = gate.execute("launch_rockets", json!({}), None).await;
        assert_eq!(result.code(), Some(ErrorCode::DeniedAgentToolset));
    }

    #[tokio::test]
    async fn test_structural_validation() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(dir.path(), Permissions::default());
        let agent = system();

        let result = gate.execute("read_file", json!({}), Some(&agent)).await;
        assert_eq!(result.code(), Some(ErrorCode::MissingArgument));
        assert_eq!(result.error.unwrap().details.unwrap()["field"], "path");

        let result = gate.execute("read_file", json!({"path": 3}), Some(&agent)).await;
        assert_eq!(result.code(), Some(ErrorCode::InvalidArgument));

        let result = gate.execute("read_file", json!(["a.txt"]), Some(&agent)).await;
        assert_eq!(result.code(), Some(ErrorCode::ValidationError));
    }

    #[tokio::test]
    async fn test_du_depth_out_of_range_via_run_command() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        let gate = gate(
            dir.path(),
            Permissions {
                allow_paths: vec![".".to_string()],
                allow_commands: vec!["du".to_string()],
                ..Default::default()
            },
        );
        let agent = system();

        let result = gate
            .execute("run_command", json!({"command": "du -d 6 src"}), Some(&agent))
            .await;
        assert_eq!(result.code(), Some(ErrorCode::InvalidArgument));

        let result = gate.execute("run_command", json!({"command": "du"}), Some(&agent)).await;
        assert_eq!(result.code(), Some(ErrorCode::MissingArgument));
    }

    #[tokio::test]
    async fn test_blocked_segment_denied_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/config"), "[core]").unwrap();
        let gate = gate(
            dir.path(),
            Permissions {
                allow_paths: vec![".".to_string(), ".git".to_string()],
                ..Default::default()
            },
        );
        let agent = system();

        for path in [".git/config", ".GIT/config"] {
            let result = gate.execute("read_file", json!({"path": path}), Some(&agent)).await;
            assert_eq!(result.code(), Some(ErrorCode::DeniedPathAllowlist), "{path}");
        }
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_exec_error() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(dir.path(), Permissions::default());
        let result = gate.execute("boom", json!({}), Some(&system())).await;
        assert!(!result.ok);
        assert_eq!(result.code(), Some(ErrorCode::ExecError));
        assert!(result.result.is_none());
    }

    #[tokio::test]
    async fn test_audit_records_every_call_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(dir.path(), Permissions::default());

        gate.execute("echo", json!({"text": "hi", "token": "abc"}), None).await;
        gate.execute("read_file", json!({"path": "a"}), None).await;

        let content = fs::read_to_string(dir.path().join("audit/audit.jsonl")).unwrap();
        let entries: Vec<AuditEntry> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].ok);
        assert_eq!(entries[0].args["token"], "[REDACTED]");
        assert!(!entries[1].ok);
        assert!(entries[1].error_message.is_some());
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_change_result() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new(dir.path(), Permissions::default(), SandboxOptions::default()).unwrap();
        let gate = ExecutionGate::new(
            Arc::new(sandbox),
            SkillRegistry::with_builtins("memory/knowledge.jsonl"),
            Some(AuditLog::new(dir.path())),
        );
        let result = gate.execute("echo", json!({"text": "hi"}), None).await;
        assert!(result.ok);
    }

    #[tokio::test]
    async fn test_debug_block() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(dir.path(), Permissions::default()).with_debug(true);
        let result = gate.execute("echo", json!({"text": "hi"}), None).await;
        let debug = result.debug.clone().unwrap();
        assert_eq!(debug["tool"], "echo");
        assert!(debug["agent"].is_null());

        let encoded = serde_json::to_value(&result).unwrap();
        assert!(encoded.get("_debug").is_some());
        assert!(encoded.get("error").is_none());
    }

    #[test]
    fn test_envelope_shapes() {
        let call: ToolCall = serde_json::from_str(r#"{"tool_name":"echo"}"#).unwrap();
        assert_eq!(call.args, json!({}));

        let agent: Agent = serde_json::from_str(r#"{"name":"w","tools":["echo"]}"#).unwrap();
        assert_eq!(agent.kind, AgentKind::User);

        let failure = ToolResult::failure(ToolError::missing_argument("path"));
        let encoded = serde_json::to_value(&failure).unwrap();
        assert_eq!(encoded["ok"], false);
        assert_eq!(encoded["error"]["code"], "MISSING_ARGUMENT");
        assert!(encoded.get("result").is_none());
    }
}
