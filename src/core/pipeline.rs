//! Pipeline domain model

use crate::core::config::SiteConfig;
use crate::core::registry::TaskRegistry;
use crate::error::{BuildError, Result};
use serde::{Deserialize, Serialize};

/// Pipeline as written in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Ordered task names, executed strictly in sequence
    pub tasks: Vec<String>,

    /// Start the dev server after the initial build
    #[serde(default)]
    pub serve: bool,

    /// Start the watch supervisor after the initial build
    #[serde(default)]
    pub watch: bool,
}

/// A named, validated pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub name: String,
    pub tasks: Vec<String>,
    pub serve: bool,
    pub watch: bool,
}

impl Pipeline {
    /// Resolve a named pipeline from the configuration, checking every
    /// referenced task against the registry before anything runs.
    pub fn resolve(config: &SiteConfig, registry: &TaskRegistry, name: &str) -> Result<Self> {
        let pipeline = config
            .pipelines
            .get(name)
            .ok_or_else(|| BuildError::UnknownPipeline(name.to_string()))?;

        for task in &pipeline.tasks {
            if !registry.contains(task) {
                return Err(BuildError::UnknownTask(task.clone()));
            }
        }

        Ok(Pipeline {
            name: name.to_string(),
            tasks: pipeline.tasks.clone(),
            serve: pipeline.serve,
            watch: pipeline.watch,
        })
    }
}
