//! Report assembly - turns station results into one plain-text report

use crate::core::{mean_confidence, StationResult};
use crate::protocol::{combine_sections, section_header, unescape_text, Level, Section, HEADER, SUBSECTION};

/// Title line of every assembled report
pub const REPORT_TITLE: &str = "التقرير الشامل - المحطات السبع";

const SUMMARY_TITLE: &str = "ملخص التحليل";

/// One station's part of an assembled report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSegment {
    /// Header text after the `---` marker
    pub title: String,
    /// Unescaped station text
    pub body: String,
}

/// Header text for a station inside the report
pub fn station_heading(result: &StationResult) -> String {
    format!("المحطة {}: {}", result.station_id, result.station_name)
}

/// Build the final report.
///
/// The report opens with the title and a summary section, both under `===`
/// headers. Every station then follows under exactly one `---` header with
/// its text escaped, so the report holds exactly one `---` per station.
pub fn assemble(outputs: &[StationResult]) -> String {
    let mut sections = Vec::with_capacity(outputs.len() + 2);
    sections.push(section_header(REPORT_TITLE, Level::Main));
    sections.push(summary(outputs).encode());

    for result in outputs {
        sections.push(
            Section::new(station_heading(result), Level::Sub)
                .text(result.text_output.trim())
                .encode(),
        );
    }

    combine_sections(&sections)
}

fn summary(outputs: &[StationResult]) -> Section {
    let succeeded = outputs.iter().filter(|o| o.success).count();
    let failed = outputs.len() - succeeded;

    let mut section = Section::new(SUMMARY_TITLE, Level::Main)
        .key_value("المحطات المنفذة", outputs.len())
        .key_value("المحطات الناجحة", succeeded)
        .key_value("المحطات المتعثرة", failed)
        .key_value("متوسط الثقة", format!("{:.2}", mean_confidence(outputs)));

    for result in outputs.iter().filter(|o| !o.success) {
        section = section.bullet(station_heading(result));
    }
    section
}

/// Split an assembled report back into its station segments, in order.
///
/// Lenient: lines outside a station segment are ignored, and a report with
/// no `---` headers yields no segments.
pub fn split_report(report: &str) -> Vec<ReportSegment> {
    let mut segments: Vec<(String, Vec<&str>)> = Vec::new();
    let mut inside = false;

    for line in report.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix(SUBSECTION) {
            segments.push((unescape_text(rest.trim()), Vec::new()));
            inside = true;
        } else if trimmed.starts_with(HEADER) {
            inside = false;
        } else if inside {
            if let Some((_, body)) = segments.last_mut() {
                body.push(line);
            }
        }
    }

    segments
        .into_iter()
        .map(|(title, body)| ReportSegment {
            title,
            body: unescape_text(body.join("\n").trim()),
        })
        .collect()
}
