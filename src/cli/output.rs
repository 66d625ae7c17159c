//! CLI output formatting

use crate::core::OperationKind;
use crate::execution::BuildEvent;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Progress bar over a pipeline's task count
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    progress
}

pub fn format_kind(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::RenderTemplate => "render-template",
        OperationKind::CompileStylesheet => "compile-stylesheet",
        OperationKind::SyncFiles => "sync-files",
        OperationKind::RunExternalCommand => "run-external-command",
        OperationKind::PostProcessOutput => "post-process-output",
        OperationKind::CleanDest => "clean-dest",
    }
}

/// Format a build event for display
pub fn format_build_event(event: &BuildEvent) -> String {
    match event {
        BuildEvent::PipelineStarted {
            run_id,
            pipeline,
            total_tasks,
        } => format!(
            "{} Starting pipeline {} ({} tasks, {})",
            ROCKET,
            style(pipeline).bold(),
            total_tasks,
            style(&run_id.to_string()[..8]).dim()
        ),
        BuildEvent::TaskStarted { task, kind } => format!(
            "{} {} {}",
            GEAR,
            style(task).cyan(),
            style(format!("[{}]", format_kind(*kind))).dim()
        ),
        BuildEvent::TaskCompleted { task, files } => {
            if *files > 0 {
                format!(
                    "{} {} ({} {})",
                    CHECK,
                    style(task).green(),
                    files,
                    if *files == 1 { "file" } else { "files" }
                )
            } else {
                format!("{} {}", CHECK, style(task).green())
            }
        }
        BuildEvent::TaskFailed { task, error } => {
            format!("{} {}: {}", CROSS, style(task).red(), style(error).dim())
        }
        BuildEvent::PipelineCompleted {
            run_id,
            pipeline,
            success,
        } => {
            let status = if *success {
                style("succeeded").green().to_string()
            } else {
                style("failed").red().to_string()
            };
            format!(
                "{} Pipeline {} {} ({})",
                INFO,
                style(pipeline).bold(),
                status,
                style(&run_id.to_string()[..8]).dim()
            )
        }
    }
}
