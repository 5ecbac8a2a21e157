//! Text-only exchange protocol
//!
//! Stations exchange and expose delimited plain text instead of JSON. The
//! markers below are load-bearing for anything that splits the text later,
//! so they are reproduced verbatim.

pub mod escape;
pub mod section;

pub use escape::{escape_text, unescape_text};
pub use section::{decode_sections, Line, Section};

use regex::Regex;
use std::sync::OnceLock;

/// Top-level header marker
pub const HEADER: &str = "===";
/// Subsection marker
pub const SUBSECTION: &str = "---";
/// Bullet list item marker
pub const LIST_ITEM: &str = "•";
/// Key-value separator
pub const KEY_VALUE: &str = ":";

/// Leading-digit-dot pattern for numbered items
pub fn numbered_item_regex() -> &'static Regex {
    static NUMBERED: OnceLock<Regex> = OnceLock::new();
    NUMBERED.get_or_init(|| Regex::new(r"^(\d+)\.\s*").expect("numbered item pattern is valid"))
}

/// Header level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// `=== title ===`
    Main,
    /// `--- title`
    Sub,
}

/// Create a section header line (without surrounding blank lines)
pub fn section_header(title: &str, level: Level) -> String {
    match level {
        Level::Main => format!("{} {} {}", HEADER, title, HEADER),
        Level::Sub => format!("{} {}", SUBSECTION, title),
    }
}

/// Create a key-value line
pub fn key_value(key: &str, value: impl std::fmt::Display) -> String {
    format!("{}{} {}", key, KEY_VALUE, value)
}

/// Create a bulleted list item
pub fn list_item(text: &str) -> String {
    format!("{} {}", LIST_ITEM, text)
}

/// Create a numbered list item
pub fn numbered_item(number: usize, text: &str) -> String {
    format!("{}. {}", number, text)
}

/// Join the non-blank sections with a blank line
pub fn combine_sections<S: AsRef<str>>(sections: &[S]) -> String {
    sections
        .iter()
        .map(|s| s.as_ref())
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Content under a `=== title ===` header, up to the next main header
pub fn extract_section(text: &str, title: &str) -> Option<String> {
    let pattern = format!(r"{}\s*{}\s*{}", HEADER, regex::escape(title), HEADER);
    let header = Regex::new(&pattern).ok()?;
    let found = header.find(text)?;
    let rest = &text[found.end()..];
    let body = match rest.find(HEADER) {
        Some(next) => &rest[..next],
        None => rest,
    };
    Some(body.trim().to_string())
}

/// Parse `key: value` lines; lines without a separator or with an empty side are skipped
pub fn parse_key_values(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(KEY_VALUE)?;
            let (key, value) = (key.trim(), value.trim());
            (!key.is_empty() && !value.is_empty()).then(|| (key.to_string(), value.to_string()))
        })
        .collect()
}

/// Parse bullet and numbered items, in order
pub fn parse_list_items(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            if let Some(rest) = trimmed.strip_prefix(LIST_ITEM) {
                Some(rest.trim().to_string())
            } else {
                numbered_item_regex()
                    .find(trimmed)
                    .map(|m| trimmed[m.end()..].trim().to_string())
            }
        })
        .collect()
}
