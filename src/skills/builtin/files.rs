//! Builtin file skills: read, write and list inside the sandbox.
//!
//! Every path goes through `SkillContext::resolve_allowed`; these skills
//! never build filesystem paths on their own.

use std::fs::{self, OpenOptions};
use std::io::Write;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ToolError;
use crate::sandbox::command::format_human;
use crate::sandbox::PathOp;
use crate::skills::{Skill, SkillContext};

use super::str_param;

/// Reads a UTF-8 text file (invalid sequences are replaced).
pub struct ReadFileSkill;

#[async_trait]
impl Skill for ReadFileSkill {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a text file inside the workspace. The path is relative to the workspace root."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Relative path of the file to read"
                }
            },
            "required": ["path"]
        })
    }

    fn capabilities(&self) -> Vec<String> {
        vec!["filesystem:read".to_string()]
    }

    async fn execute(&self, params: Value, context: &SkillContext) -> Result<Value, ToolError> {
        let requested = str_param(&params, "path")?;
        let path = context.resolve_allowed(requested, PathOp::Read)?;
        if path.is_dir() {
            return Err(ToolError::invalid_argument(
                "path",
                format!("'{requested}' is a directory"),
            ));
        }
        let bytes = fs::read(&path)?;
        Ok(json!({
            "path": requested,
            "content": String::from_utf8_lossy(&bytes),
        }))
    }
}

/// Writes (or appends to) a file, creating parent directories.
pub struct WriteFileSkill;

#[async_trait]
impl Skill for WriteFileSkill {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write text content to a file inside the workspace, replacing it unless \
         'append' is true. Parent directories are created as needed."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Relative path of the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "Text content to write"
                },
                "append": {
                    "type": "boolean",
                    "description": "Append instead of replacing (default false)"
                }
            },
            "required": ["path", "content"]
        })
    }

    fn capabilities(&self) -> Vec<String> {
        vec!["filesystem:write".to_string()]
    }

    async fn execute(&self, params: Value, context: &SkillContext) -> Result<Value, ToolError> {
        let requested = str_param(&params, "path")?;
        let content = str_param(&params, "content")?;
        let append = params["append"].as_bool().unwrap_or(false);

        let path = context.resolve_allowed(requested, PathOp::Write)?;
        if path.is_dir() {
            return Err(ToolError::invalid_argument(
                "path",
                format!("'{requested}' is a directory"),
            ));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        if append {
            let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
            file.write_all(content.as_bytes())?;
        } else {
            fs::write(&path, content)?;
        }

        info!(
            "Wrote {} bytes to {requested}{}",
            content.len(),
            if append { " (append)" } else { "" }
        );

        Ok(json!({
            "path": requested,
            "bytes_written": content.len(),
            "append": append,
        }))
    }
}

/// Lists a directory, directories first.
pub struct ListDirSkill;

#[async_trait]
impl Skill for ListDirSkill {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> &str {
        "List the entries of a directory inside the workspace, directories first."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Relative path of the directory ('.' for the workspace root)"
                }
            },
            "required": ["path"]
        })
    }

    fn capabilities(&self) -> Vec<String> {
        vec!["filesystem:list".to_string()]
    }

    async fn execute(&self, params: Value, context: &SkillContext) -> Result<Value, ToolError> {
        let requested = str_param(&params, "path")?;
        let path = context.resolve_allowed(requested, PathOp::List)?;
        if !path.is_dir() {
            return Err(ToolError::invalid_argument(
                "path",
                format!("'{requested}' is not a directory"),
            ));
        }

        let mut entries = Vec::new();
        for dirent in fs::read_dir(&path)? {
            let dirent = dirent?;
            let meta = fs::symlink_metadata(dirent.path())?;
            entries.push((
                dirent.file_name().to_string_lossy().to_string(),
                meta.is_dir(),
                meta.len(),
            ));
        }
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let entries: Vec<Value> = entries
            .into_iter()
            .map(|(name, is_dir, size)| {
                if is_dir {
                    json!({ "name": name, "is_dir": true })
                } else {
                    json!({ "name": name, "is_dir": false, "size": size, "human_size": format_human(size) })
                }
            })
            .collect();

        Ok(json!({
            "path": requested,
            "entries": entries,
        }))
    }
}
