//! Watch supervisor - re-runs pipelines when matching files change
//!
//! Filesystem changes arrive on an explicit event queue; a polling scanner
//! feeds it. The supervisor consumes the queue one trigger at a time, so
//! watch-triggered pipeline runs never overlap, and a run that fails leaves
//! the session watching.

use crate::core::Pipeline;
use crate::error::Result;
use crate::execution::PipelineEngine;
use crate::files;
use crate::ops::OperationRunner;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Supervisor lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Watching,
    Triggering,
}

/// A file pattern set bound to the pipeline it re-runs
#[derive(Debug, Clone)]
pub struct WatchSubscription {
    pub patterns: Vec<String>,
    pub pipeline: Pipeline,
}

/// A filesystem change matching a subscription
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Index into the supervisor's subscription list
    pub subscription: usize,
    pub path: PathBuf,
}

/// Consumes the change-event queue and re-runs the bound pipelines
pub struct WatchSupervisor<R> {
    engine: std::sync::Arc<PipelineEngine<R>>,
    subscriptions: Vec<WatchSubscription>,
    debounce: Duration,
    state: WatchState,
}

impl<R: OperationRunner> WatchSupervisor<R> {
    pub fn new(
        engine: std::sync::Arc<PipelineEngine<R>>,
        subscriptions: Vec<WatchSubscription>,
        debounce: Duration,
    ) -> Self {
        Self {
            engine,
            subscriptions,
            debounce,
            state: WatchState::Idle,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Watch until the event queue closes or shutdown fires.
    ///
    /// After the first event of a burst, the debounce window is waited out
    /// and everything queued in the meantime is coalesced: each subscription
    /// triggers at most once per burst, in first-event order.
    pub async fn run(
        &mut self,
        mut events: mpsc::Receiver<ChangeEvent>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        self.state = WatchState::Watching;
        info!("Watching {} subscription(s)", self.subscriptions.len());

        loop {
            let first = tokio::select! {
                _ = &mut shutdown => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            tokio::time::sleep(self.debounce).await;
            let mut triggered = vec![first.subscription];
            while let Ok(event) = events.try_recv() {
                if !triggered.contains(&event.subscription) {
                    triggered.push(event.subscription);
                }
            }

            for index in triggered {
                let subscription = &self.subscriptions[index];
                self.state = WatchState::Triggering;
                info!(
                    "Change detected, running pipeline '{}'",
                    subscription.pipeline.name
                );
                if let Err(error) = self.engine.run(&subscription.pipeline).await {
                    warn!(
                        "Watch-triggered pipeline '{}' failed: {}",
                        subscription.pipeline.name, error
                    );
                }
                self.state = WatchState::Watching;
            }
        }

        self.state = WatchState::Idle;
        info!("Watch session stopped");
    }
}

/// Polling change scanner feeding the supervisor's event queue.
///
/// Takes mtime snapshots of every file matching a subscription and emits a
/// [`ChangeEvent`] per changed, added or removed file on each poll.
pub fn spawn_scanner(
    source_root: PathBuf,
    patterns: Vec<Vec<String>>,
    poll_interval: Duration,
    sender: mpsc::Sender<ChangeEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut snapshots: Vec<HashMap<PathBuf, SystemTime>> = Vec::new();
        for subscription in &patterns {
            snapshots.push(snapshot(&source_root, subscription).unwrap_or_default());
        }

        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            for (index, subscription) in patterns.iter().enumerate() {
                let current = match snapshot(&source_root, subscription) {
                    Ok(current) => current,
                    Err(error) => {
                        warn!("scan failed: {}", error);
                        continue;
                    }
                };

                for (path, mtime) in &current {
                    if snapshots[index].get(path) != Some(mtime) {
                        debug!("changed: {}", path.display());
                        if sender
                            .send(ChangeEvent {
                                subscription: index,
                                path: path.clone(),
                            })
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                }
                for path in snapshots[index].keys() {
                    if !current.contains_key(path) {
                        debug!("removed: {}", path.display());
                        if sender
                            .send(ChangeEvent {
                                subscription: index,
                                path: path.clone(),
                            })
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                }
                snapshots[index] = current;
            }
        }
    })
}

fn snapshot(source_root: &Path, patterns: &[String]) -> Result<HashMap<PathBuf, SystemTime>> {
    let mut mtimes = HashMap::new();
    for relative in files::expand(source_root, patterns)? {
        let path = source_root.join(&relative);
        if let Ok(mtime) = std::fs::metadata(&path).and_then(|m| m.modified()) {
            mtimes.insert(relative, mtime);
        }
    }
    Ok(mtimes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ConfigStore, SiteConfig, TaskDefinition, TaskRegistry};
    use crate::error::Result;
    use crate::ops::{OpOutcome, OperationRunner};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingRunner {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl OperationRunner for CountingRunner {
        async fn run(&self, _task: &TaskDefinition, _config: &ConfigStore) -> Result<OpOutcome> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(OpOutcome::default())
        }
    }

    fn fixture() -> (Arc<PipelineEngine<CountingRunner>>, Pipeline) {
        let config = SiteConfig::from_yaml(
            r#"
source: src
dest: dist
tasks:
  - name: templates
    kind: render-template
pipelines:
  default:
    tasks: [templates]
"#,
        )
        .unwrap();
        let store = Arc::new(ConfigStore::resolve(&config).unwrap());
        let registry = Arc::new(TaskRegistry::from_config(&config).unwrap());
        let pipeline = Pipeline::resolve(&config, &registry, "default").unwrap();
        let engine = Arc::new(PipelineEngine::new(
            store,
            registry,
            CountingRunner {
                runs: AtomicUsize::new(0),
            },
        ));
        (engine, pipeline)
    }

    #[tokio::test]
    async fn test_burst_is_coalesced_into_one_run() {
        let (engine, pipeline) = fixture();
        let subscription = WatchSubscription {
            patterns: vec!["**/*.ejs".to_string()],
            pipeline,
        };
        let mut supervisor = WatchSupervisor::new(
            engine.clone(),
            vec![subscription],
            Duration::from_millis(50),
        );

        let (sender, receiver) = mpsc::channel(16);
        let (stop_sender, stop_receiver) = oneshot::channel();

        // Two events inside the debounce window
        sender
            .send(ChangeEvent {
                subscription: 0,
                path: PathBuf::from("a.ejs"),
            })
            .await
            .unwrap();
        sender
            .send(ChangeEvent {
                subscription: 0,
                path: PathBuf::from("b.ejs"),
            })
            .await
            .unwrap();
        drop(sender);

        supervisor.run(receiver, stop_receiver).await;
        drop(stop_sender);

        assert_eq!(engine.runner_runs(), 1);
        assert_eq!(supervisor.state(), WatchState::Idle);
    }

    #[tokio::test]
    async fn test_failed_run_keeps_watching() {
        struct FailingRunner;

        #[async_trait]
        impl OperationRunner for FailingRunner {
            async fn run(
                &self,
                task: &TaskDefinition,
                _config: &ConfigStore,
            ) -> Result<OpOutcome> {
                Err(crate::error::BuildError::Task {
                    task: task.name.clone(),
                    file: None,
                    cause: "broken".into(),
                })
            }
        }

        let config = SiteConfig::from_yaml(
            r#"
source: src
dest: dist
tasks:
  - name: templates
    kind: render-template
pipelines:
  default:
    tasks: [templates]
"#,
        )
        .unwrap();
        let store = Arc::new(ConfigStore::resolve(&config).unwrap());
        let registry = Arc::new(TaskRegistry::from_config(&config).unwrap());
        let pipeline = Pipeline::resolve(&config, &registry, "default").unwrap();
        let engine = Arc::new(PipelineEngine::new(store, registry, FailingRunner));

        let mut supervisor = WatchSupervisor::new(
            engine,
            vec![WatchSubscription {
                patterns: vec!["**/*.ejs".to_string()],
                pipeline,
            }],
            Duration::from_millis(10),
        );

        let (sender, receiver) = mpsc::channel(16);
        let (_stop_sender, stop_receiver) = oneshot::channel();
        sender
            .send(ChangeEvent {
                subscription: 0,
                path: PathBuf::from("a.ejs"),
            })
            .await
            .unwrap();
        drop(sender);

        // The failed rebuild must not abort the loop early; the queue
        // closing is what ends it.
        supervisor.run(receiver, stop_receiver).await;
        assert_eq!(supervisor.state(), WatchState::Idle);
    }

    impl PipelineEngine<CountingRunner> {
        fn runner_runs(&self) -> usize {
            self.runner_ref().runs.load(Ordering::SeqCst)
        }
    }
}
