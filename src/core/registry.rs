//! Task registry - name to definition bookkeeping

use crate::core::config::SiteConfig;
use crate::core::task::TaskDefinition;
use crate::error::{BuildError, Result};
use std::collections::HashMap;

/// Mapping from task name to its definition, immutable once loaded
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, TaskDefinition>,
    order: Vec<String>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from a validated configuration
    pub fn from_config(config: &SiteConfig) -> Result<Self> {
        let mut registry = Self::new();
        for task in &config.tasks {
            registry.register(TaskDefinition::from_config(task))?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, definition: TaskDefinition) -> Result<()> {
        if self.tasks.contains_key(&definition.name) {
            return Err(BuildError::DuplicateTask(definition.name));
        }
        self.order.push(definition.name.clone());
        self.tasks.insert(definition.name.clone(), definition);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&TaskDefinition> {
        self.tasks
            .get(name)
            .ok_or_else(|| BuildError::UnknownTask(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Task names in registration order
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::{OperationKind, TaskConfig};
    use std::collections::BTreeMap;

    fn definition(name: &str) -> TaskDefinition {
        TaskDefinition::from_config(&TaskConfig {
            name: name.to_string(),
            kind: OperationKind::SyncFiles,
            src: vec![],
            dest: None,
            options: BTreeMap::new(),
        })
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = TaskRegistry::new();
        registry.register(definition("sync")).unwrap();
        assert!(registry.get("sync").is_ok());
        assert_eq!(registry.names(), &["sync".to_string()]);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = TaskRegistry::new();
        registry.register(definition("sync")).unwrap();
        let err = registry.register(definition("sync")).unwrap_err();
        assert!(matches!(err, BuildError::DuplicateTask(name) if name == "sync"));
    }

    #[test]
    fn test_unknown_lookup_fails() {
        let registry = TaskRegistry::new();
        let err = registry.get("missing").unwrap_err();
        assert!(matches!(err, BuildError::UnknownTask(name) if name == "missing"));
    }
}
