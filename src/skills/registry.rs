use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::builtin::{
    EchoSkill, GetTimeSkill, ListDirSkill, MemoryRecallSkill, MemoryStoreSkill, ReadFileSkill,
    RunCommandSkill, WriteFileSkill,
};
use super::Skill;

/// Owned registry of the skills a gate can dispatch to.
///
/// Built explicitly by the caller and handed to the gate; there is no
/// process-wide registry.
#[derive(Default)]
pub struct SkillRegistry {
    skills: BTreeMap<String, Arc<dyn Skill>>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every builtin skill. `memory_path` is the knowledge
    /// store location, relative to the sandbox base directory.
    pub fn with_builtins(memory_path: &str) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(EchoSkill));
        registry.register(Arc::new(GetTimeSkill));
        registry.register(Arc::new(ReadFileSkill));
        registry.register(Arc::new(WriteFileSkill));
        registry.register(Arc::new(ListDirSkill));
        registry.register(Arc::new(RunCommandSkill));
        registry.register(Arc::new(MemoryStoreSkill::new(memory_path)));
        registry.register(Arc::new(MemoryRecallSkill::new(memory_path)));
        registry
    }

    /// Registers a skill, replacing any previous skill with the same name.
    pub fn register(&mut self, skill: Arc<dyn Skill>) {
        let name = skill.name().to_string();
        debug!("Registering skill: {name}");
        if self.skills.insert(name.clone(), skill).is_some() {
            warn!("Skill '{name}' registered twice, keeping the latest");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Skill>> {
        self.skills.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.skills.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}
