//! Task domain model

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// The closed set of delegated operations a task can perform.
///
/// Kinds are fixed at compile time; a configuration naming anything else is
/// rejected while parsing, not discovered mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    /// Render templates into HTML files under the destination root
    RenderTemplate,
    /// Compile stylesheet entry files into CSS
    CompileStylesheet,
    /// Copy matched files into the destination root
    SyncFiles,
    /// Run an external command as a subprocess
    RunExternalCommand,
    /// Transform already-generated output files in place
    PostProcessOutput,
    /// Remove the destination root tree
    CleanDest,
}

/// Task definition as written in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Unique task name
    pub name: String,

    /// What the task delegates to
    pub kind: OperationKind,

    /// Source glob patterns relative to the source root; `!` prefix excludes
    #[serde(default)]
    pub src: Vec<String>,

    /// Destination subfolder under the destination root
    #[serde(default)]
    pub dest: Option<String>,

    /// Options recognized by the operation kind
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

/// A validated task held by the registry
#[derive(Debug, Clone)]
pub struct TaskDefinition {
    pub name: String,
    pub kind: OperationKind,
    pub src: Vec<String>,
    pub dest: Option<String>,
    options: BTreeMap<String, Value>,
}

impl TaskDefinition {
    pub fn from_config(config: &TaskConfig) -> Self {
        Self {
            name: config.name.clone(),
            kind: config.kind,
            src: config.src.clone(),
            dest: config.dest.clone(),
            options: config.options.clone(),
        }
    }

    /// Boolean option with a default when absent
    pub fn bool_option(&self, key: &str, default: bool) -> bool {
        self.options
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    /// String option, None when absent or not a string
    pub fn str_option(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    /// String-map option, e.g. extra template data
    pub fn map_option(&self, key: &str) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        if let Some(Value::Mapping(mapping)) = self.options.get(key) {
            for (k, v) in mapping {
                if let (Some(k), Some(v)) = (k.as_str(), v.as_str()) {
                    map.insert(k.to_string(), v.to_string());
                }
            }
        }
        map
    }
}
