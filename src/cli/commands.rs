//! CLI command definitions

use clap::Args;

/// Run a pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub pipeline: String,

    /// Path to runner configuration file (defaults to CICD_* environment variables)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use the mock executor instead of running commands
    #[arg(long)]
    pub mock: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Validate a pipeline definition
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub pipeline: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
