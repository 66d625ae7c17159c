//! Core domain models
//!
//! This module defines the configuration file format and the validated
//! domain objects built from it: tasks, the task registry and pipelines.

pub mod config;
pub mod pipeline;
pub mod registry;
pub mod task;

pub use config::{ConfigStore, SiteConfig};
pub use pipeline::*;
pub use registry::*;
pub use task::*;
