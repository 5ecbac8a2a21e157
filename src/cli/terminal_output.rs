//! Terminal rendering of a finished run
//!
//! Prints each station of an assembled report under a `[N/M] name` header,
//! with horizontal separators sized to the terminal.

use crate::cli::output::{format_output, style};
use crate::core::PipelineRunResult;
use crate::execution::split_report;
use std::io::{self, Write};

/// Lines shown per station unless the full report is requested
const PREVIEW_LINES: usize = 12;

/// Terminal width, 80 when stdout is not a terminal
pub fn terminal_width() -> usize {
    term_size::dimensions_stdout()
        .map(|(w, _)| w)
        .unwrap_or(80)
}

/// A horizontal rule of the given width
pub fn separator(width: usize) -> String {
    "─".repeat(width)
}

/// Header line for one station: `[N/M] name`
pub fn station_header(index: usize, total: usize, title: &str) -> String {
    format!("[{}/{}] {}", index, total, title)
}

/// Print the station segments of a run's report
pub fn print_report(run: &PipelineRunResult, full: bool) {
    let width = terminal_width();
    let segments = split_report(&run.full_report);
    let total = segments.len();

    for (index, (segment, result)) in segments.iter().zip(&run.outputs).enumerate() {
        println!("{}", style(separator(width)).dim());
        let header = station_header(index + 1, total, &segment.title);
        if result.success {
            println!("{}", style(header).bold().cyan());
        } else {
            println!("{}", style(header).bold().red());
        }

        if full {
            println!("{}", segment.body);
        } else {
            println!("{}", format_output(&segment.body, PREVIEW_LINES));
        }
    }
    println!("{}", style(separator(width)).dim());

    // Flush so the report lands before the final status line
    let _ = io::stdout().flush();
}
