//! Structured tool errors.
//!
//! Every denial and failure that can reach a caller is a `ToolError`
//! carrying one of the stable `ErrorCode` strings. Callers branch on the
//! code, never on the message text.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Stable error codes, serialized as `SCREAMING_SNAKE_CASE` strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    DeniedCommandAllowlist,
    DeniedPathAllowlist,
    DeniedToolBlocklist,
    DeniedAgentToolset,
    ConfirmationRequired,
    ValidationError,
    InvalidArgument,
    MissingArgument,
    UnknownTool,
    ExecError,
    Timeout,
    ParseError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DeniedCommandAllowlist => "DENIED_COMMAND_ALLOWLIST",
            ErrorCode::DeniedPathAllowlist => "DENIED_PATH_ALLOWLIST",
            ErrorCode::DeniedToolBlocklist => "DENIED_TOOL_BLOCKLIST",
            ErrorCode::DeniedAgentToolset => "DENIED_AGENT_TOOLSET",
            ErrorCode::ConfirmationRequired => "CONFIRMATION_REQUIRED",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::MissingArgument => "MISSING_ARGUMENT",
            ErrorCode::UnknownTool => "UNKNOWN_TOOL",
            ErrorCode::ExecError => "EXEC_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::ParseError => "PARSE_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured failure returned by capabilities, commands and skills.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ToolError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ToolError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn denied_path(path: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::DeniedPathAllowlist,
            format!("Path '{path}' is not allowed"),
        )
        .with_details(json!({ "path": path.to_string() }))
    }

    pub fn missing_argument(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingArgument,
            format!("Missing required argument: {field}"),
        )
        .with_details(json!({ "field": field }))
    }

    pub fn invalid_argument(field: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, message).with_details(json!({ "field": field }))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn exec(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ExecError, message)
    }
}

impl From<std::io::Error> for ToolError {
    fn from(e: std::io::Error) -> Self {
        ToolError::exec(format!("I/O error: {e}"))
    }
}

impl From<anyhow::Error> for ToolError {
    fn from(e: anyhow::Error) -> Self {
        ToolError::exec(format!("{e:#}"))
    }
}
