use anyhow::{Context, Result};
use sitebuild::cli::commands::{ListCommand, RunCommand, ValidateCommand};
use sitebuild::cli::output::*;
use sitebuild::cli::{Cli, Command};
use sitebuild::{
    BuildRunner, ConfigStore, DevServer, Pipeline, PipelineEngine, SiteConfig, TaskRegistry,
    WatchSubscription, WatchSupervisor,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd, &cli).await?,
        Command::Validate(cmd) => validate_config(cmd, &cli)?,
        Command::List(cmd) => list_pipelines(cmd, &cli)?,
    }

    Ok(())
}

async fn run_pipeline(cmd: &RunCommand, cli: &Cli) -> Result<()> {
    let config = SiteConfig::from_file(&cli.config).context("Failed to load site config")?;

    let store = Arc::new(ConfigStore::resolve(&config)?);
    let registry = Arc::new(TaskRegistry::from_config(&config)?);
    let pipeline = Pipeline::resolve(&config, &registry, &cmd.pipeline)?;

    println!(
        "{} {} -> {}",
        INFO,
        style(store.source_root().display()).dim(),
        style(store.dest_root().display()).dim()
    );

    let engine = Arc::new(PipelineEngine::new(
        store.clone(),
        registry.clone(),
        BuildRunner::new(),
    ));

    let progress = create_progress_bar(pipeline.tasks.len());
    let bar = progress.clone();
    engine.add_event_handler(move |event| {
        bar.println(format_build_event(event));
        match event {
            sitebuild::BuildEvent::TaskStarted { task, .. } => bar.set_message(task.clone()),
            sitebuild::BuildEvent::TaskCompleted { .. }
            | sitebuild::BuildEvent::TaskFailed { .. } => bar.inc(1),
            _ => {}
        }
    });

    let result = engine.run(&pipeline).await;
    progress.finish_and_clear();

    if let Err(failure) = result {
        eprintln!("{} {}", CROSS, style(&failure).red());
        std::process::exit(1);
    }

    let serve_enabled = pipeline.serve && !cmd.no_serve;
    let watch_enabled = pipeline.watch && !cmd.no_watch;
    if !serve_enabled && !watch_enabled {
        return Ok(());
    }

    let mut server_handle = None;
    if serve_enabled {
        let server = DevServer::new(store.dest_root(), config.server.port);
        // Bind up front so a busy port fails the command, not a background
        // task.
        let listener = server.bind().await?;
        println!(
            "{} Dev server on {}",
            ROCKET,
            style(format!("http://127.0.0.1:{}", config.server.port)).bold()
        );
        server_handle = Some(tokio::spawn(async move {
            if let Err(failure) = server.serve_on(listener).await {
                error!("Dev server stopped: {}", failure);
            }
        }));
    }

    if watch_enabled {
        let mut subscriptions = Vec::new();
        let mut patterns = Vec::new();
        for subscription in &config.watch {
            let target = Pipeline::resolve(&config, &registry, &subscription.pipeline)?;
            patterns.push(subscription.patterns.clone());
            subscriptions.push(WatchSubscription {
                patterns: subscription.patterns.clone(),
                pipeline: target,
            });
        }

        let (sender, receiver) = tokio::sync::mpsc::channel(64);
        let scanner = sitebuild::watch::spawn_scanner(
            store.source_root(),
            patterns,
            Duration::from_millis(500),
            sender,
        );

        let (stop_sender, stop_receiver) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            stop_sender.send(()).ok();
        });

        println!("{} Watching for changes (Ctrl-C to stop)", INFO);
        let mut supervisor =
            WatchSupervisor::new(engine, subscriptions, Duration::from_millis(250));
        supervisor.run(receiver, stop_receiver).await;
        scanner.abort();
    } else {
        println!("{} Ctrl-C to stop", INFO);
        tokio::signal::ctrl_c().await?;
    }

    if let Some(handle) = server_handle {
        handle.abort();
    }

    Ok(())
}

fn validate_config(cmd: &ValidateCommand, cli: &Cli) -> Result<()> {
    println!("{} Validating {}...", INFO, style(&cli.config).bold());

    match SiteConfig::from_file(&cli.config) {
        Ok(config) => {
            println!("{} Configuration is valid!", CHECK);
            println!("  Source: {}", style(&config.source).bold());
            println!("  Dest: {}", style(&config.dest).bold());
            println!("  Tasks: {}", style(config.tasks.len()).cyan());
            println!("  Pipelines: {}", style(config.pipelines.len()).cyan());
            println!("  Watch subscriptions: {}", style(config.watch.len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(failure) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(failure).red());
            std::process::exit(1);
        }
    }
}

fn list_pipelines(cmd: &ListCommand, cli: &Cli) -> Result<()> {
    let config = SiteConfig::from_file(&cli.config).context("Failed to load site config")?;

    if cmd.json {
        let data: Vec<_> = config
            .pipelines
            .iter()
            .map(|(name, pipeline)| {
                serde_json::json!({
                    "name": name,
                    "tasks": pipeline.tasks,
                    "serve": pipeline.serve,
                    "watch": pipeline.watch,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "pipelines": data }))?
        );
        return Ok(());
    }

    println!("{} Pipelines:", INFO);
    for (name, pipeline) in &config.pipelines {
        let mut flags = String::new();
        if pipeline.serve {
            flags.push_str(" +serve");
        }
        if pipeline.watch {
            flags.push_str(" +watch");
        }
        println!(
            "  {} [{}]{}",
            style(name).bold(),
            pipeline.tasks.join(", "),
            style(flags).dim()
        );
    }

    Ok(())
}
