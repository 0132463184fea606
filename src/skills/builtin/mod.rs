pub mod basic;
pub mod command;
pub mod files;
pub mod memory;

pub use basic::{EchoSkill, GetTimeSkill};
pub use command::RunCommandSkill;
pub use files::{ListDirSkill, ReadFileSkill, WriteFileSkill};
pub use memory::{MemoryRecallSkill, MemoryStoreSkill};

/// Extracts a required string parameter. The gate has already checked
/// presence and type; this only guards direct callers.
pub(crate) fn str_param<'a>(
    params: &'a serde_json::Value,
    key: &str,
) -> Result<&'a str, crate::error::ToolError> {
    params[key]
        .as_str()
        .ok_or_else(|| crate::error::ToolError::missing_argument(key))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;
    use std::sync::Arc;

    use crate::sandbox::{Permissions, Sandbox, SandboxOptions};
    use crate::skills::SkillContext;

    pub fn context(dir: &Path, allow_paths: &[&str], allow_commands: &[&str]) -> SkillContext {
        let permissions = Permissions {
            allow_paths: allow_paths.iter().map(|s| s.to_string()).collect(),
            allow_commands: allow_commands.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        let sandbox = Sandbox::new(dir, permissions, SandboxOptions::default()).unwrap();
        SkillContext::new(Arc::new(sandbox), Some("tester".to_string()))
    }
}
