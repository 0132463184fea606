use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::skills::{Skill, SkillContext};

use super::str_param;

/// Runs one allowlisted command through the sandbox.
///
/// `ls`, `cat`, `pwd` and `du` are served by in-process built-ins; any
/// other allowlisted program is spawned with the base directory as cwd.
pub struct RunCommandSkill;

#[async_trait]
impl Skill for RunCommandSkill {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Run a single allowlisted command (e.g. 'ls -la src', 'du -h -d 1 .') \
         inside the workspace. No shell: pipes, redirects and globbing are not supported."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "Command line, with single or double quotes for arguments containing spaces"
                }
            },
            "required": ["command"]
        })
    }

    fn capabilities(&self) -> Vec<String> {
        vec!["process:run".to_string()]
    }

    async fn execute(&self, params: Value, context: &SkillContext) -> Result<Value, ToolError> {
        let command = str_param(&params, "command")?;
        let output = context.run_allowed(command).await?;
        Ok(json!({ "output": output }))
    }
}
