//! Heuristic confidence scoring for station output

use crate::core::station::StationDefinition;
use crate::protocol::{decode_sections, Line};

/// Output shorter than this many characters is considered thin
const ADEQUATE_LENGTH: usize = 400;

const LENGTH_WEIGHT: f64 = 0.3;
const ARABIC_WEIGHT: f64 = 0.25;
const STRUCTURE_WEIGHT: f64 = 0.2;
const COVERAGE_WEIGHT: f64 = 0.25;

/// Score a successful station's text in [0, 1].
///
/// Weighs length adequacy, share of Arabic letters, use of protocol
/// structure and coverage of the station's expected sections. Output that
/// looks like JSON is halved.
pub fn score(station: &StationDefinition, text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let chars = trimmed.chars().count();
    let length = (chars as f64 / ADEQUATE_LENGTH as f64).min(1.0);

    let mut score = LENGTH_WEIGHT * length
        + ARABIC_WEIGHT * arabic_ratio(trimmed)
        + STRUCTURE_WEIGHT * structure(trimmed)
        + COVERAGE_WEIGHT * coverage(&station.expected_output_shape, trimmed);

    if looks_like_json(trimmed) {
        score *= 0.5;
    }

    score.clamp(0.0, 1.0)
}

/// Share of alphabetic characters that are in the Arabic block
pub fn arabic_ratio(text: &str) -> f64 {
    let (arabic, letters) = text
        .chars()
        .filter(|c| c.is_alphabetic())
        .fold((0usize, 0usize), |(arabic, letters), c| {
            let is_arabic = matches!(c, '\u{0600}'..='\u{06FF}' | '\u{0750}'..='\u{077F}');
            (arabic + usize::from(is_arabic), letters + 1)
        });
    if letters == 0 {
        0.0
    } else {
        arabic as f64 / letters as f64
    }
}

fn structure(text: &str) -> f64 {
    let sections = decode_sections(text);
    let headed = sections.iter().filter(|s| s.title.is_some()).count();
    let structured_lines = sections
        .iter()
        .flat_map(|s| s.lines.iter())
        .filter(|l| !matches!(l, Line::Text(_)))
        .count();

    let mut value: f64 = 0.0;
    if headed > 0 {
        value += 0.5;
    }
    if structured_lines > 0 {
        value += 0.5;
    }
    value
}

fn coverage(expected: &[String], text: &str) -> f64 {
    if expected.is_empty() {
        return 1.0;
    }
    let found = expected
        .iter()
        .filter(|section| text.contains(section.as_str()))
        .count();
    found as f64 / expected.len() as f64
}

/// Whether the text is (or opens with) a JSON document or code fence
pub fn looks_like_json(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with('{') || trimmed.starts_with('[') || trimmed.starts_with("```")
}
