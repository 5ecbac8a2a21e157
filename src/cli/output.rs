//! CLI output formatting

use crate::{
    core::RunStatus,
    execution::PipelineEvent,
    persistence::RunSummary,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a progress bar over the stations
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    progress.set_style(style);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a run status for display
pub fn format_status(status: RunStatus) -> String {
    match status {
        RunStatus::Idle => style("IDLE").dim().to_string(),
        RunStatus::Running(station) => style(format!("RUNNING (station {})", station))
            .yellow()
            .to_string(),
        RunStatus::Completed => style("COMPLETED").green().to_string(),
        RunStatus::Failed => style("FAILED").red().to_string(),
        RunStatus::Cancelled => style("CANCELLED").yellow().to_string(),
    }
}

/// Format a run summary for display
pub fn format_run_summary(summary: &RunSummary) -> String {
    let status_icon = match summary.status {
        RunStatus::Completed => CHECK,
        RunStatus::Failed => CROSS,
        RunStatus::Running(_) => SPINNER,
        _ => INFO,
    };

    let short_id = summary.run_id.to_string();
    format!(
        "{} {} - {} - {} ({}/{}) - {} - {}",
        status_icon,
        style(&short_id[..8]).dim(),
        style(summary.started_at.format("%Y-%m-%d %H:%M")).bold(),
        format_status(summary.status),
        summary.succeeded_stations,
        summary.total_stations,
        style(format!("{:.0}%", summary.confidence * 100.0)).cyan(),
        format_duration(Duration::from_millis(summary.execution_time_ms))
    )
}

/// Format a pipeline event for display
pub fn format_pipeline_event(event: &PipelineEvent) -> String {
    match event {
        PipelineEvent::RunStarted {
            run_id,
            total_stations,
        } => format!(
            "{} Starting analysis over {} stations ({})",
            ROCKET,
            style(total_stations).bold(),
            style(&run_id.to_string()[..8]).dim()
        ),
        PipelineEvent::StationStarted {
            station_id, name, ..
        } => format!("{} {} {}", SPINNER, style(station_id).dim(), style(name).cyan()),
        PipelineEvent::StationFallback {
            station_id, model, ..
        } => format!(
            "{} station {} answered by fallback model {}",
            WARN,
            style(station_id).yellow(),
            style(model).dim()
        ),
        PipelineEvent::StationCompleted {
            station_id,
            name,
            confidence,
            ..
        } => format!(
            "{} {} {} {}",
            CHECK,
            style(station_id).dim(),
            style(name).green(),
            style(format!("({:.0}%)", confidence * 100.0)).dim()
        ),
        PipelineEvent::StationFailed {
            station_id,
            name,
            error,
            ..
        } => format!(
            "{} {} {}: {}",
            CROSS,
            style(station_id).dim(),
            style(name).red(),
            style(error).dim()
        ),
        PipelineEvent::RunFinished {
            run_id,
            status,
            success,
        } => {
            let outcome = if *success {
                format!("{} completed", style("successfully").green())
            } else {
                format_status(*status)
            };
            format!(
                "{} Analysis ({}) {}",
                INFO,
                style(&run_id.to_string()[..8]).dim(),
                outcome
            )
        }
    }
}

/// Format station output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
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

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
