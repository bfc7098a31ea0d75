//! CLI output formatting

use crate::{
    core::{ExecutionStatus, RunReport, StepResult},
    execution::ExecutionEvent,
};
use console::Emoji;
use std::fmt::Write;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

const SEPARATOR: &str = "--------------------------------------------------";

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

fn format_result_status(result: &StepResult) -> String {
    if result.success {
        style("SUCCESS").green().to_string()
    } else {
        style("FAILED").red().to_string()
    }
}

/// Human-friendly duration: milliseconds below one second
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs == 0 {
        format!("{}ms", duration.as_millis())
    } else if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Prefix every line with `prefix`
pub fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format step output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.trim_end().to_string()
    } else {
        let truncated = lines[..max_lines].join("\n");
        format!(
            "{}\n{}... ({} more lines)",
            truncated,
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name,
            concurrency,
        } => format!(
            "{} Starting pipeline {} ({}, concurrency {})",
            ROCKET,
            style(pipeline_name).bold(),
            style(&execution_id.to_string()[..8]).dim(),
            concurrency
        ),
        ExecutionEvent::StepStarted { step_name } => {
            format!("{} {}", SPINNER, style(step_name).cyan())
        }
        ExecutionEvent::StepFinished { result } if result.success => format!(
            "{} {} {}",
            CHECK,
            style(result.step_name()).green(),
            style(format_duration(result.duration)).dim()
        ),
        ExecutionEvent::StepFinished { result } => format!(
            "{} {}: {}",
            CROSS,
            style(result.step_name()).red(),
            style(&result.error).dim()
        ),
        ExecutionEvent::PipelineFinished {
            execution_id,
            status,
        } => format!(
            "{} Pipeline ({}) {}",
            INFO,
            style(&execution_id.to_string()[..8]).dim(),
            format_status(*status)
        ),
    }
}

/// Full human-readable report, results in declaration order
pub fn format_run_report(report: &RunReport, max_output_lines: usize) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", SEPARATOR);
    let _ = writeln!(
        out,
        "Pipeline: {} ({})",
        style(&report.pipeline_name).bold(),
        style(report.execution_id).dim()
    );
    let _ = writeln!(out, "Workspace: {}", report.workspace.display());
    let _ = writeln!(out, "Concurrency: {}", report.concurrency);
    let _ = writeln!(out, "{}", SEPARATOR);

    for (index, result) in report.sorted_results().iter().enumerate() {
        let _ = writeln!(
            out,
            "[{}] {} - {} ({}, exit code {})",
            index + 1,
            style(result.step_name()).bold(),
            format_result_status(result),
            format_duration(result.duration),
            result.exit_code
        );

        let output = format_output(&result.output, max_output_lines);
        if !output.is_empty() {
            let _ = writeln!(out, "{}", indent(&output, "    "));
        }
        if !result.error.is_empty() {
            let _ = writeln!(out, "    {} {}", style("error:").red(), result.error);
        }
    }

    let _ = writeln!(out, "{}", SEPARATOR);
    let failed = report.failed_steps().len();
    let elapsed = report.elapsed().map(format_duration).unwrap_or_else(|| "-".to_string());
    if report.is_success() {
        let _ = write!(
            out,
            "{} {} steps passed in {}",
            CHECK,
            report.results.len(),
            elapsed
        );
    } else {
        let _ = write!(
            out,
            "{} {} of {} steps failed in {}",
            CROSS,
            failed,
            report.results.len(),
            elapsed
        );
    }

    out
}
