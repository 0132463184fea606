//! Guarded spawn for allowlisted commands without a builtin.
//!
//! Every argument that can name a path (a bare operand, the value of
//! `--opt=value`, or a path-like `-Xvalue` suffix) goes through the same
//! resolution and allowlist checks as the file tools before anything is
//! spawned.
//!
//! Outcomes are kept distinguishable: `TIMEOUT`, and `EXEC_ERROR` with
//! `details.kind` set to `spawn_failed`, `signal` or `exit_status`.

use std::process::Stdio;
use std::time::Duration;

use serde_json::json;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{ErrorCode, ToolError};
use crate::sandbox::allowlist::PathOp;
use crate::sandbox::path::{has_parent_segment, looks_absolute};
use crate::sandbox::PathGuard;

/// Maximum output returned to the caller (in bytes, per stream).
const MAX_OUTPUT_BYTES: usize = 64 * 1024;

fn truncate_output(bytes: &[u8]) -> String {
    if bytes.len() <= MAX_OUTPUT_BYTES {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    let mut text = String::from_utf8_lossy(&bytes[..MAX_OUTPUT_BYTES]).into_owned();
    text.push_str(&format!(
        "\n[Output truncated at {MAX_OUTPUT_BYTES} bytes]"
    ));
    text
}

/// The part of `arg` that may name a path, and whether it must be treated
/// as one even when nothing exists under that name.
fn path_operand(arg: &str) -> Option<(&str, bool)> {
    if arg == "-" || arg == "--" {
        return None;
    }
    if let Some(long) = arg.strip_prefix("--") {
        return long.split_once('=').map(|(_, value)| (value, false));
    }
    if let Some(short) = arg.strip_prefix('-') {
        // `-la` and `-n5` are flag clusters; only `-C/etc`, `-f.env` and
        // the like carry a path.
        let value = short.get(1..).unwrap_or_default();
        return is_path_like(value).then_some((value, true));
    }
    Some((arg, false))
}

fn is_path_like(value: &str) -> bool {
    value.contains(['/', '\\']) || value.starts_with('.') || looks_absolute(value)
}

/// Denies the command before spawning if any path operand escapes the
/// base directory, names a blocked segment or is not allowlisted.
///
/// Plain words that name nothing on disk (`hello`, `-n`) pass through.
fn check_path_operands(args: &[String], paths: &PathGuard) -> Result<(), ToolError> {
    for arg in args {
        let Some((operand, forced)) = path_operand(arg) else {
            continue;
        };
        if operand.is_empty() {
            continue;
        }
        if looks_absolute(operand) || has_parent_segment(operand) {
            warn!("Denied spawn argument '{arg}' (absolute or traversal)");
            return Err(ToolError::denied_path(operand));
        }
        let on_disk = std::fs::symlink_metadata(paths.base_dir().join(operand)).is_ok();
        if forced || on_disk || is_path_like(operand) {
            paths.resolve_allowed(operand, PathOp::Write)?;
        }
    }
    Ok(())
}

pub(super) async fn spawn_guarded(
    program: &str,
    args: &[String],
    paths: &PathGuard,
    timeout: Duration,
) -> Result<String, ToolError> {
    check_path_operands(args, paths)?;

    let cwd = paths.base_dir();
    debug!("Spawning {program} in {}", cwd.display());

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Err(_) => {
            warn!("Command '{program}' timed out after {}s", timeout.as_secs_f64());
            return Err(ToolError::new(
                ErrorCode::Timeout,
                format!(
                    "Command '{program}' timed out after {}s",
                    timeout.as_secs_f64()
                ),
            )
            .with_details(json!({ "timeout_ms": timeout.as_millis() as u64 })));
        }
        Ok(Err(e)) => {
            return Err(ToolError::exec(format!("Failed to spawn '{program}': {e}"))
                .with_details(json!({ "kind": "spawn_failed", "command": program })));
        }
        Ok(Ok(output)) => output,
    };

    if output.status.success() {
        return Ok(truncate_output(&output.stdout));
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = output.status.signal() {
            return Err(ToolError::exec(format!(
                "Command '{program}' terminated by signal {signal}"
            ))
            .with_details(json!({
                "kind": "signal",
                "command": program,
                "signal": signal,
            })));
        }
    }

    let stderr = truncate_output(&output.stderr);
    let status = output.status.code();
    Err(ToolError::exec(format!(
        "Command '{program}' exited with status {}: {}",
        status.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string()),
        stderr.trim()
    ))
    .with_details(json!({
        "kind": "exit_status",
        "command": program,
        "status": status,
        "stderr": stderr,
    })))
}
