//! Pure builtin skills: no filesystem, no processes.
//!
//! These are the only tools that may run without an agent identity.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::skills::{Skill, SkillContext};

use super::str_param;

/// Returns its `text` parameter unchanged.
pub struct EchoSkill;

#[async_trait]
impl Skill for EchoSkill {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Return the given text unchanged. Useful to check that the tool pipeline works."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "Text to echo back"
                }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, params: Value, _context: &SkillContext) -> Result<Value, ToolError> {
        Ok(json!(str_param(&params, "text")?))
    }
}

/// Returns the current UTC time as RFC 3339.
pub struct GetTimeSkill;

#[async_trait]
impl Skill for GetTimeSkill {
    fn name(&self) -> &str {
        "get_time"
    }

    fn description(&self) -> &str {
        "Return the current date and time (UTC, RFC 3339)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _params: Value, _context: &SkillContext) -> Result<Value, ToolError> {
        Ok(json!(chrono::Utc::now().to_rfc3339()))
    }
}
