//! Append-only audit trail of completed tool calls.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::store;

/// Strings longer than this are truncated in audit records.
pub const MAX_AUDIT_STRING: usize = 256;

/// Key fragments whose values are never written to the audit log.
const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "secret",
    "token",
    "api_key",
    "apikey",
    "authorization",
    "credential",
];

/// One line of the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: String,
    pub tool: String,
    pub args: Value,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl AuditEntry {
    /// Builds an entry stamped with the current time. `args` is sanitized here.
    pub fn new(
        tool: &str,
        args: &Value,
        ok: bool,
        error_message: Option<String>,
        duration_ms: Option<u64>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            tool: tool.to_string(),
            args: sanitize_args(args),
            ok,
            error_message,
            duration_ms,
        }
    }
}

/// Redacts sensitive keys and truncates long strings, recursively.
pub fn sanitize_args(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(truncate(s)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_args).collect()),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, v) in map {
                let sanitized = if is_sensitive_key(key) {
                    Value::String("[REDACTED]".to_string())
                } else {
                    sanitize_args(v)
                };
                out.insert(key.clone(), sanitized);
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_lowercase();
    SENSITIVE_KEYS.iter().any(|fragment| key.contains(fragment))
}

fn truncate(s: &str) -> String {
    let total = s.chars().count();
    if total <= MAX_AUDIT_STRING {
        return s.to_string();
    }
    let kept: String = s.chars().take(MAX_AUDIT_STRING).collect();
    format!("{kept}…[truncated {} chars]", total - MAX_AUDIT_STRING)
}

/// Best-effort JSONL audit writer.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one entry. Failures are logged and swallowed.
    pub fn record(&self, entry: &AuditEntry) {
        if let Err(e) = store::append_one(&self.path, entry) {
            warn!("Audit write to {} failed: {e:#}", self.path.display());
        }
    }
}
