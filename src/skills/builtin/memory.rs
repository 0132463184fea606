use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::error::ToolError;
use crate::sandbox::PathOp;
use crate::skills::{Skill, SkillContext};
use crate::store;

use super::str_param;

/// Scope used when a skill runs without an agent identity.
const DEFAULT_SCOPE: &str = "default";

/// A single knowledge entry. Stored as one JSON object per line.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
struct KnowledgeEntry {
    agent: String,
    key: String,
    content: String,
    ts: String,
}

fn is_valid_entry(entry: &KnowledgeEntry) -> bool {
    !entry.key.trim().is_empty() && !entry.agent.is_empty()
}

fn scope(context: &SkillContext) -> String {
    context.agent().unwrap_or(DEFAULT_SCOPE).to_string()
}

/// Skill that stores knowledge entries for later recall.
///
/// Each entry has a unique key within the calling agent's scope; storing
/// with the same key replaces the previous value. Agents never see each
/// other's entries.
pub struct MemoryStoreSkill {
    path: String,
}

impl MemoryStoreSkill {
    /// `path` is the knowledge file, relative to the sandbox base directory.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Skill for MemoryStoreSkill {
    fn name(&self) -> &str {
        "memory_store"
    }

    fn description(&self) -> &str {
        "Store a piece of knowledge for later recall. Each entry has a unique key; \
         storing with the same key replaces the previous value. \
         Examples of good keys: 'preferred_language', 'project_name', 'timezone'."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "key": {
                    "type": "string",
                    "description": "A short, descriptive key for this knowledge entry"
                },
                "content": {
                    "type": "string",
                    "description": "The knowledge content to store"
                }
            },
            "required": ["key", "content"]
        })
    }

    fn capabilities(&self) -> Vec<String> {
        vec!["filesystem:knowledge:write".to_string()]
    }

    async fn execute(&self, params: Value, context: &SkillContext) -> Result<Value, ToolError> {
        let key = str_param(&params, "key")?;
        let content = str_param(&params, "content")?;
        if key.trim().is_empty() {
            return Err(ToolError::invalid_argument("key", "key must not be empty"));
        }

        let path = context.resolve_allowed(&self.path, PathOp::Write)?;
        let agent = scope(context);
        let new_entry = KnowledgeEntry {
            agent: agent.clone(),
            key: key.to_string(),
            content: content.to_string(),
            ts: chrono::Utc::now().to_rfc3339(),
        };

        let mut entries: Vec<KnowledgeEntry> = store::read_safely(&path, is_valid_entry)?;

        let replaced = match entries
            .iter()
            .position(|e| e.agent == agent && e.key == key)
        {
            Some(pos) => {
                entries[pos] = new_entry;
                store::write_atomic(&path, &entries)?;
                true
            }
            None => {
                store::append_one(&path, &new_entry)?;
                false
            }
        };

        info!("Knowledge entry '{key}' stored for {agent}");

        Ok(json!({
            "stored": key,
            "replaced": replaced,
        }))
    }
}

/// Skill that recalls stored knowledge entries.
///
/// Searches by case-insensitive substring match across keys and content.
/// An empty query lists everything in the caller's scope.
pub struct MemoryRecallSkill {
    path: String,
}

impl MemoryRecallSkill {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Skill for MemoryRecallSkill {
    fn name(&self) -> &str {
        "memory_recall"
    }

    fn description(&self) -> &str {
        "Recall stored knowledge. Search by keyword to find relevant entries, \
         or use an empty query to list all stored knowledge."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query to find matching knowledge entries. \
                                    Use an empty string to list all entries."
                }
            },
            "required": ["query"]
        })
    }

    fn capabilities(&self) -> Vec<String> {
        vec!["filesystem:knowledge:read".to_string()]
    }

    async fn execute(&self, params: Value, context: &SkillContext) -> Result<Value, ToolError> {
        let query = str_param(&params, "query")?;
        let path = context.resolve_allowed(&self.path, PathOp::Read)?;
        let agent = scope(context);

        let entries: Vec<KnowledgeEntry> = store::read_safely(&path, is_valid_entry)?
            .into_iter()
            .filter(|e| e.agent == agent)
            .collect();

        if entries.is_empty() {
            return Ok(json!({
                "summary": "No knowledge entries stored yet.",
                "entries": [],
            }));
        }

        let query_lower = query.to_lowercase();
        let matches: Vec<&KnowledgeEntry> = entries
            .iter()
            .filter(|e| {
                query.is_empty()
                    || e.key.to_lowercase().contains(&query_lower)
                    || e.content.to_lowercase().contains(&query_lower)
            })
            .collect();

        let summary = if matches.is_empty() {
            format!("No knowledge entries found matching: {query}")
        } else {
            format!("Found {} knowledge entries", matches.len())
        };

        let found: Vec<Value> = matches
            .iter()
            .map(|e| json!({ "key": e.key, "content": e.content, "ts": e.ts }))
            .collect();

        Ok(json!({
            "summary": summary,
            "entries": found,
        }))
    }
}
