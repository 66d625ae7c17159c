//! Crate-wide error taxonomy

use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Duplicate task '{0}'")]
    DuplicateTask(String),

    #[error("Unknown task '{0}'")]
    UnknownTask(String),

    #[error("Unknown pipeline '{0}'")]
    UnknownPipeline(String),

    #[error("Path '{}' escapes root '{}'", .path.display(), .root.display())]
    Path { path: PathBuf, root: PathBuf },

    #[error("Invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("Task '{task}' failed{}: {cause}", file_suffix(.file))]
    Task {
        task: String,
        file: Option<PathBuf>,
        cause: String,
    },

    #[error("Port {0} is already in use")]
    PortInUse(u16),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn file_suffix(file: &Option<PathBuf>) -> String {
    match file {
        Some(path) => format!(" in '{}'", path.display()),
        None => String::new(),
    }
}

impl BuildError {
    /// A task-level failure tied to a specific file. The engine fills in the
    /// task name via [`BuildError::for_task`] when it surfaces the failure.
    pub fn in_file(path: impl AsRef<Path>, cause: impl Into<String>) -> Self {
        BuildError::Task {
            task: String::new(),
            file: Some(path.as_ref().to_path_buf()),
            cause: cause.into(),
        }
    }

    /// Attribute a failure to the named task, preserving any file context.
    pub fn for_task(task: &str, cause: BuildError) -> Self {
        match cause {
            BuildError::Task { file, cause, .. } => BuildError::Task {
                task: task.to_string(),
                file,
                cause,
            },
            other => BuildError::Task {
                task: task.to_string(),
                file: None,
                cause: other.to_string(),
            },
        }
    }
}
