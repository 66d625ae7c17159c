//! Pipeline execution engine - runs a pipeline's tasks strictly in sequence

use crate::core::{ConfigStore, OperationKind, Pipeline, TaskRegistry};
use crate::error::{BuildError, Result};
use crate::ops::OperationRunner;
use std::sync::{Arc, Mutex};
use tracing::{error, info};
use uuid::Uuid;

/// Events that occur during a pipeline run
#[derive(Debug, Clone)]
pub enum BuildEvent {
    PipelineStarted {
        run_id: Uuid,
        pipeline: String,
        total_tasks: usize,
    },
    TaskStarted {
        task: String,
        kind: OperationKind,
    },
    TaskCompleted {
        task: String,
        files: usize,
    },
    TaskFailed {
        task: String,
        error: String,
    },
    PipelineCompleted {
        run_id: Uuid,
        pipeline: String,
        success: bool,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(&BuildEvent) + Send + Sync>;

/// Runs pipelines against a registry and the resolved configuration.
///
/// Tasks are opaque to the engine: each is handed to the runner by
/// definition and either succeeds with an output file list or fails. Task
/// N+1 never starts before task N completes, and the first failure halts
/// the run with no rollback of completed tasks.
pub struct PipelineEngine<R> {
    config: Arc<ConfigStore>,
    registry: Arc<TaskRegistry>,
    runner: R,
    handlers: Mutex<Vec<EventHandler>>,
}

impl<R: OperationRunner> PipelineEngine<R> {
    pub fn new(config: Arc<ConfigStore>, registry: Arc<TaskRegistry>, runner: R) -> Self {
        Self {
            config,
            registry,
            runner,
            handlers: Mutex::new(Vec::new()),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(&BuildEvent) + Send + Sync + 'static,
    {
        self.handlers.lock().expect("handler lock").push(Arc::new(handler));
    }

    fn emit(&self, event: BuildEvent) {
        for handler in self.handlers.lock().expect("handler lock").iter() {
            handler(&event);
        }
    }

    /// Execute every task of the pipeline in declared order
    pub async fn run(&self, pipeline: &Pipeline) -> Result<()> {
        let run_id = Uuid::new_v4();
        info!("Starting pipeline '{}' ({})", pipeline.name, run_id);
        self.emit(BuildEvent::PipelineStarted {
            run_id,
            pipeline: pipeline.name.clone(),
            total_tasks: pipeline.tasks.len(),
        });

        for task_name in &pipeline.tasks {
            let task = match self.registry.get(task_name) {
                Ok(task) => task,
                Err(failure) => {
                    error!("Task '{}' failed: {}", task_name, failure);
                    self.emit(BuildEvent::TaskFailed {
                        task: task_name.clone(),
                        error: failure.to_string(),
                    });
                    self.emit(BuildEvent::PipelineCompleted {
                        run_id,
                        pipeline: pipeline.name.clone(),
                        success: false,
                    });
                    return Err(failure);
                }
            };
            self.emit(BuildEvent::TaskStarted {
                task: task_name.clone(),
                kind: task.kind,
            });

            match self.runner.run(task, &self.config).await {
                Ok(outcome) => {
                    info!("Task '{}' completed ({} files)", task_name, outcome.files.len());
                    self.emit(BuildEvent::TaskCompleted {
                        task: task_name.clone(),
                        files: outcome.files.len(),
                    });
                }
                Err(cause) => {
                    let failure = BuildError::for_task(task_name, cause);
                    error!("Task '{}' failed: {}", task_name, failure);
                    self.emit(BuildEvent::TaskFailed {
                        task: task_name.clone(),
                        error: failure.to_string(),
                    });
                    self.emit(BuildEvent::PipelineCompleted {
                        run_id,
                        pipeline: pipeline.name.clone(),
                        success: false,
                    });
                    return Err(failure);
                }
            }
        }

        info!("Pipeline '{}' completed", pipeline.name);
        self.emit(BuildEvent::PipelineCompleted {
            run_id,
            pipeline: pipeline.name.clone(),
            success: true,
        });
        Ok(())
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    #[cfg(test)]
    pub(crate) fn runner_ref(&self) -> &R {
        &self.runner
    }
}
