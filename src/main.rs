use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use agent_sandbox::config::Config;
use agent_sandbox::error::{ErrorCode, ToolError};
use agent_sandbox::gate::{AuditLog, ExecutionGate, ToolCall, ToolResult};
use agent_sandbox::sandbox::{Permissions, Sandbox, SandboxOptions};
use agent_sandbox::skills::SkillRegistry;

/// Exit status for malformed stdin.
const EXIT_PARSE_ERROR: i32 = 2;

/// Exit status when the sandbox itself cannot be built.
const EXIT_SANDBOX_ERROR: i32 = 1;

fn print_help() {
    println!(
        "\
agent-sandbox v{}

Runs one tool call inside a capability-gated sandbox.
Reads a {{\"tool_name\", \"args\"}} envelope on stdin and writes a
{{\"ok\", \"result\"|\"error\"}} envelope on stdout.

USAGE:
    agent-sandbox [OPTIONS] < call.json

OPTIONS:
    -c, --config PATH        TOML configuration file [default: config/sandbox.toml]
    -a, --agent NAME         Run as the named agent from [[agents]]
        --base-dir DIR       Sandbox root (overrides [sandbox].base_dir)
        --permissions PATH   Permissions file, relative to the sandbox root
    -h, --help               Print this help message and exit
    -V, --version            Print version and exit

ENVIRONMENT VARIABLES:
    RUST_LOG                     Log level filter for tracing (logs go to stderr)
                                 (e.g. debug, agent_sandbox=debug,warn)
    AGENT_SANDBOX_PERMISSIONS    Permissions file, checked before every other location

EXIT STATUS:
    0    a result envelope was written (ok or structured error)
    1    the sandbox could not be built (e.g. missing base directory)
    2    stdin was not a valid tool-call envelope

EXAMPLES:
    echo '{{\"tool_name\":\"get_time\",\"args\":{{}}}}' | agent-sandbox
    echo '{{\"tool_name\":\"run_command\",\"args\":{{\"command\":\"ls -la\"}}}}' \\
        | agent-sandbox --agent indexer",
        env!("CARGO_PKG_VERSION"),
    );
}

#[derive(Debug, Default)]
struct CliArgs {
    config: Option<PathBuf>,
    agent: Option<String>,
    base_dir: Option<PathBuf>,
    permissions: Option<String>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs> {
    let mut cli = CliArgs::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .ok_or_else(|| anyhow!("option {name} requires a value"))
        };
        match arg.as_str() {
            "-c" | "--config" => cli.config = Some(PathBuf::from(value("--config")?)),
            "-a" | "--agent" => cli.agent = Some(value("--agent")?),
            "--base-dir" => cli.base_dir = Some(PathBuf::from(value("--base-dir")?)),
            "--permissions" => cli.permissions = Some(value("--permissions")?),
            other => return Err(anyhow!("unknown argument: {other}")),
        }
    }
    Ok(cli)
}

fn emit(result: &ToolResult) {
    match serde_json::to_string(result) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            error!("Failed to encode result: {e}");
            println!(r#"{{"ok":false,"error":{{"code":"EXEC_ERROR","message":"failed to encode result"}}}}"#);
        }
    }
}

fn read_call(mut reader: impl Read) -> Result<ToolCall, ToolError> {
    let mut input = String::new();
    reader
        .read_to_string(&mut input)
        .map_err(|e| ToolError::new(ErrorCode::ParseError, format!("Failed to read stdin: {e}")))?;
    serde_json::from_str(&input)
        .map_err(|e| ToolError::new(ErrorCode::ParseError, format!("Invalid tool-call envelope: {e}")))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --help / --version before anything else
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("agent-sandbox v{}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {}
        }
    }

    // stdout carries the result envelope, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("agent_sandbox=info")),
        )
        .init();

    let cli = match parse_args(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("agent-sandbox: {e}. See --help");
            std::process::exit(EXIT_PARSE_ERROR);
        }
    };

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config/sandbox.toml"));
    info!("Loading configuration from {}", config_path.display());
    let config = Config::load_or_default(&config_path);

    let call = match read_call(std::io::stdin()) {
        Ok(call) => call,
        Err(e) => {
            error!("{e}");
            emit(&ToolResult::failure(e));
            std::process::exit(EXIT_PARSE_ERROR);
        }
    };

    let base_dir = cli.base_dir.clone().unwrap_or_else(|| config.sandbox.base_dir.clone());
    let explicit = cli.permissions.as_deref().or(config.sandbox.permissions.as_deref());
    let permissions = Permissions::load(&base_dir, explicit);
    let options = SandboxOptions {
        case_insensitive: config.sandbox.case_insensitive,
    };

    let sandbox = match Sandbox::new(&base_dir, permissions, options) {
        Ok(sandbox) => {
            sandbox.with_spawn_timeout(Duration::from_secs(config.sandbox.spawn_timeout_secs))
        }
        Err(e) => {
            error!("Cannot build sandbox: {e:#}");
            emit(&ToolResult::failure(ToolError::from(e)));
            std::process::exit(EXIT_SANDBOX_ERROR);
        }
    };

    let agent = match cli.agent.as_deref() {
        Some(name) => {
            let found = config.find_agent(name).cloned();
            if found.is_none() {
                warn!("Unknown agent '{name}', running without an agent identity");
            }
            found
        }
        None => None,
    };

    let registry = SkillRegistry::with_builtins(&config.memory.path);
    info!("Skills: {} registered", registry.len());

    let audit = config
        .audit
        .enabled
        .then(|| AuditLog::new(config.audit.path.clone()));
    let gate = ExecutionGate::new(Arc::new(sandbox), registry, audit)
        .with_debug(config.sandbox.debug);

    let result = gate.execute(&call.tool_name, call.args, agent.as_ref()).await;
    emit(&result);
    Ok(())
}
