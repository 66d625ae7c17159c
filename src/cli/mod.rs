//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{ListCommand, RunCommand, ValidateCommand};
use std::ffi::OsString;

/// Static-site build pipeline runner
#[derive(Debug, Parser, Clone)]
#[command(name = "sitebuild")]
#[command(version = "0.1.0")]
#[command(about = "A declarative build-pipeline runner for static sites", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the site configuration file
    #[arg(short, long, global = true, default_value = "site.yaml")]
    pub config: String,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a named pipeline
    Run(RunCommand),

    /// Validate the site configuration
    Validate(ValidateCommand),

    /// List pipelines and their task sequences
    List(ListCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_defaults_to_default_pipeline() {
        let cli = Cli::try_parse_from(["sitebuild", "run"]).unwrap();
        match cli.command {
            Command::Run(cmd) => assert_eq!(cmd.pipeline, "default"),
            other => panic!("expected run command, got {:?}", other),
        }
        assert_eq!(cli.config, "site.yaml");
    }

    #[test]
    fn test_run_named_pipeline() {
        let cli = Cli::try_parse_from(["sitebuild", "run", "deploy", "-c", "other.yaml"]).unwrap();
        match cli.command {
            Command::Run(cmd) => assert_eq!(cmd.pipeline, "deploy"),
            other => panic!("expected run command, got {:?}", other),
        }
        assert_eq!(cli.config, "other.yaml");
    }
}
