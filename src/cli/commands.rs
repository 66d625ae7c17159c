//! CLI command definitions

use clap::Args;

/// Run a named pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Pipeline to run
    #[arg(default_value = "default")]
    pub pipeline: String,

    /// Skip the dev server even when the pipeline declares it
    #[arg(long)]
    pub no_serve: bool,

    /// Skip the watch supervisor even when the pipeline declares it
    #[arg(long)]
    pub no_watch: bool,
}

/// Validate the site configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Output the parsed configuration as JSON
    #[arg(long)]
    pub json: bool,
}

/// List pipelines and their task sequences
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
