//! Allowlisted command execution.
//!
//! A command line is tokenized, its first token checked against
//! `allow_commands`, and only then executed. Recognized commands (`ls`,
//! `cat`, `pwd`, `du`) always run as in-process reimplementations whose
//! path arguments go through the sandbox path checks. Any other
//! allowlisted command is spawned with a hard timeout.

mod builtins;
mod spawn;

use std::time::Duration;

use serde_json::json;
use tracing::{info, warn};

use crate::error::{ErrorCode, ToolError};

use super::PathGuard;

pub use builtins::format_human;

/// Hard limit for spawned processes.
pub const SPAWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Commands implemented in-process instead of spawned.
pub const BUILTIN_COMMANDS: &[&str] = &["ls", "cat", "pwd", "du"];

/// Splits a command line on unquoted whitespace.
///
/// `"` and `'` open a quoted region closed by the same character, in which
/// whitespace is literal. There is no escape character and no expansion.
pub fn parse_shell_args(input: &str) -> Result<Vec<String>, ToolError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(ToolError::validation(format!("Unterminated {q} quote in command")));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Validates and executes allowlisted commands.
#[derive(Debug, Clone)]
pub struct CommandSandbox {
    allow_commands: Vec<String>,
    spawn_timeout: Duration,
}

impl CommandSandbox {
    pub fn new(allow_commands: Vec<String>) -> Self {
        Self {
            allow_commands,
            spawn_timeout: SPAWN_TIMEOUT,
        }
    }

    pub fn with_spawn_timeout(mut self, timeout: Duration) -> Self {
        self.spawn_timeout = timeout;
        self
    }

    pub fn is_allowed(&self, program: &str) -> bool {
        self.allow_commands.iter().any(|c| c == program)
    }

    /// Runs `command_text` and returns its output text.
    ///
    /// Nothing touches the filesystem or the process table before the
    /// allowlist check passes.
    pub async fn run(&self, command_text: &str, paths: &PathGuard) -> Result<String, ToolError> {
        let tokens = parse_shell_args(command_text)?;
        let Some((program, args)) = tokens.split_first() else {
            return Err(ToolError::validation("Empty command"));
        };

        if !self.is_allowed(program) {
            let allowed = if self.allow_commands.is_empty() {
                "(none)".to_string()
            } else {
                self.allow_commands.join(", ")
            };
            warn!("Denied command '{program}' (not in allow_commands)");
            return Err(ToolError::new(
                ErrorCode::DeniedCommandAllowlist,
                format!("Command '{program}' is not allowed. Allowed commands: {allowed}"),
            )
            .with_details(json!({
                "command": program,
                "allowed": self.allow_commands,
            })));
        }

        let strategy = if BUILTIN_COMMANDS.contains(&program.as_str()) {
            "builtin"
        } else {
            "spawn"
        };
        info!("Running command: {program} ({} args, {strategy})", args.len());

        match program.as_str() {
            "ls" => builtins::ls(args, paths),
            "cat" => builtins::cat(args, paths),
            "pwd" => builtins::pwd(args, paths),
            "du" => builtins::du(args, paths),
            _ => spawn::spawn_guarded(program, args, paths, self.spawn_timeout).await,
        }
    }
}
