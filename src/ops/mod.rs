//! Delegated build operations
//!
//! The execution engine treats every task as a black box behind the
//! [`OperationRunner`] trait: it hands over the task definition and the
//! resolved configuration, and gets back success with an output file list,
//! or a failure. `BuildRunner` is the production implementation, one module
//! per operation kind; tests substitute recording mocks.

pub mod clean;
pub mod exec;
pub mod postprocess;
pub mod stylesheet;
pub mod sync;
pub mod template;

use crate::core::{ConfigStore, OperationKind, TaskDefinition};
use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// What a completed operation reports back to the engine
#[derive(Debug, Clone, Default)]
pub struct OpOutcome {
    /// Files the operation produced or touched
    pub files: Vec<PathBuf>,
}

impl OpOutcome {
    pub fn files(files: Vec<PathBuf>) -> Self {
        Self { files }
    }
}

/// Executes a single task invocation
#[async_trait]
pub trait OperationRunner: Send + Sync {
    async fn run(&self, task: &TaskDefinition, config: &ConfigStore) -> Result<OpOutcome>;
}

/// Production runner dispatching on the operation kind
#[derive(Debug, Default)]
pub struct BuildRunner;

impl BuildRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OperationRunner for BuildRunner {
    async fn run(&self, task: &TaskDefinition, config: &ConfigStore) -> Result<OpOutcome> {
        match task.kind {
            OperationKind::RenderTemplate => template::render(task, config),
            OperationKind::CompileStylesheet => stylesheet::compile(task, config),
            OperationKind::SyncFiles => sync::sync(task, config),
            OperationKind::RunExternalCommand => exec::run(task, config).await,
            OperationKind::PostProcessOutput => postprocess::apply(task, config),
            OperationKind::CleanDest => clean::clean(config),
        }
    }
}
