//! sitebuild - a declarative build-pipeline runner for static sites

pub mod cli;
pub mod core;
pub mod error;
pub mod execution;
pub mod files;
pub mod ops;
pub mod serve;
pub mod watch;

// Re-export commonly used types
pub use crate::core::{
    ConfigStore, OperationKind, Pipeline, SiteConfig, TaskDefinition, TaskRegistry,
};
pub use crate::error::{BuildError, Result};
pub use crate::execution::{BuildEvent, PipelineEngine};
pub use crate::ops::{BuildRunner, OpOutcome, OperationRunner};
pub use crate::serve::DevServer;
pub use crate::watch::{ChangeEvent, WatchState, WatchSubscription, WatchSupervisor};
