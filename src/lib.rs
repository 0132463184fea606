//! Capability-gated execution sandbox for agent tool calls.
//!
//! A tool call enters through [`gate::ExecutionGate`], which checks the
//! caller's agent scope, the global deny-list and the confirmation policy
//! before handing the skill a [`skills::SkillContext`]. The context is the
//! skill's only route to the filesystem ([`sandbox::PathGuard`]) and the
//! process table ([`sandbox::CommandSandbox`]).

pub mod config;
pub mod error;
pub mod gate;
pub mod sandbox;
pub mod skills;
pub mod store;

pub use error::{ErrorCode, ToolError};
pub use gate::{Agent, AgentKind, ExecutionGate, ToolCall, ToolResult};
pub use sandbox::{Permissions, Sandbox, SandboxOptions};
