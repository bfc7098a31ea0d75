use anyhow::{Context, Result};
use cicd_runner::cli::commands::{RunCommand, ValidateCommand};
use cicd_runner::cli::output::*;
use cicd_runner::cli::{Cli, Command};
use cicd_runner::core::config::LogConfig;
use cicd_runner::core::{Config, Pipeline};
use cicd_runner::execution::{RunError, Runner};
use std::path::Path;
use tracing::error;
use tracing_subscriber::EnvFilter;

const REPORT_OUTPUT_LINES: usize = 20;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    match &cli.command {
        Command::Run(cmd) => {
            let config = load_config(cmd)?;
            init_logging(cli.verbose, &config.log)?;
            run_pipeline(cmd, config).await
        }
        Command::Validate(cmd) => {
            init_logging(cli.verbose, &LogConfig::default())?;
            validate_pipeline(cmd)
        }
    }
}

/// Level from --verbose, else RUST_LOG, else the configured level
fn init_logging(verbose: bool, log: &LogConfig) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level))
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let result = if log.format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| anyhow::anyhow!(e)).context("Failed to set logging subscriber")
}

fn load_config(cmd: &RunCommand) -> Result<Config> {
    let mut config = match &cmd.config {
        Some(path) => Config::load(path).with_context(|| format!("Failed to load config {}", path))?,
        None => Config::from_env(),
    };

    if cmd.mock {
        config.executor.kind = "mock".to_string();
    }
    config.validate().context("Invalid runner configuration")?;

    Ok(config)
}

fn require_pipeline_file(path: &str) {
    if !Path::new(path).exists() {
        eprintln!("{} Pipeline file not found: {}", CROSS, style(path).bold());
        eprintln!("Usage: cicd-runner run --pipeline <path> [--config <path>] [--mock] [--json]");
        std::process::exit(1);
    }
}

async fn run_pipeline(cmd: &RunCommand, config: Config) -> Result<()> {
    require_pipeline_file(&cmd.pipeline);

    let mut runner = Runner::new(config);
    if !cmd.json {
        runner.add_event_handler(|event| println!("{}", format_execution_event(&event)));
    }

    let outcome = runner.run(&cmd.pipeline).await;

    let report = match &outcome {
        Ok(report) => Some(report),
        Err(e) => e.report(),
    };
    if let Some(report) = report {
        if cmd.json {
            println!("{}", serde_json::to_string_pretty(report)?);
        } else {
            println!("\n{}", format_run_report(report, REPORT_OUTPUT_LINES));
        }
    }

    match outcome {
        Ok(report) => {
            if !cmd.json {
                println!(
                    "\n{} {} completed {}",
                    CHECK,
                    style(&report.pipeline_name).bold(),
                    style("successfully").green()
                );
            }
            Ok(())
        }
        Err(e @ RunError::StepFailed { .. }) => {
            error!("{}", e);
            if !cmd.json {
                println!("\n{} {}", CROSS, style(&e).red());
            }
            std::process::exit(1);
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("{} {}", CROSS, style(&e).red());
            std::process::exit(1);
        }
    }
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    require_pipeline_file(&cmd.pipeline);

    if cmd.json {
        return match Pipeline::load(&cmd.pipeline) {
            Ok(pipeline) => {
                println!("{}", serde_json::to_string_pretty(&pipeline)?);
                Ok(())
            }
            Err(e) => {
                eprintln!("{} {}", CROSS, style(e).red());
                std::process::exit(1);
            }
        };
    }

    println!("{} Validating pipeline...", INFO);

    match Pipeline::load(&cmd.pipeline) {
        Ok(pipeline) => {
            println!("{} Pipeline definition is valid!", CHECK);
            println!("  Name: {}", style(&pipeline.name).bold());
            println!("  Steps: {}", style(pipeline.steps.len()).cyan());
            println!("  Concurrency: {}", style(pipeline.concurrency.max(1)).cyan());
            println!("  Variables: {}", style(pipeline.env.len()).cyan());

            let skipped: Vec<&str> = pipeline
                .steps
                .iter()
                .filter(|s| !s.should_run())
                .map(|s| s.name.as_str())
                .collect();
            if !skipped.is_empty() {
                println!("{} Steps that will not run: {}", WARN, skipped.join(", "));
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}
