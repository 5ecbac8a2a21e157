//! Structured sections and their plain-text encoding

use crate::protocol::{
    escape_text, key_value, list_item, numbered_item, numbered_item_regex, section_header,
    unescape_text, Level, HEADER, KEY_VALUE, LIST_ITEM, SUBSECTION,
};

/// Keys longer than this many words are treated as prose, not key-value pairs
const MAX_KEY_WORDS: usize = 5;

/// One line inside a section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Text(String),
    KeyValue(String, String),
    Bullet(String),
    Numbered(usize, String),
}

/// A titled block of lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// `None` for text that appeared before any header
    pub title: Option<String>,
    pub level: Level,
    pub lines: Vec<Line>,
}

impl Section {
    pub fn new(title: impl Into<String>, level: Level) -> Self {
        Self {
            title: Some(title.into()),
            level,
            lines: Vec::new(),
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        for line in text.into().lines() {
            self.lines.push(Line::Text(line.to_string()));
        }
        self
    }

    pub fn key_value(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.lines.push(Line::KeyValue(key.into(), value.to_string()));
        self
    }

    pub fn bullet(mut self, item: impl Into<String>) -> Self {
        self.lines.push(Line::Bullet(item.into()));
        self
    }

    pub fn numbered(mut self, item: impl Into<String>) -> Self {
        let next = self
            .lines
            .iter()
            .filter(|l| matches!(l, Line::Numbered(..)))
            .count()
            + 1;
        self.lines.push(Line::Numbered(next, item.into()));
        self
    }

    /// Render the section as one string. Free text is escaped so it cannot
    /// be mistaken for a header.
    pub fn encode(&self) -> String {
        let mut out = Vec::with_capacity(self.lines.len() + 1);
        if let Some(title) = &self.title {
            out.push(section_header(&escape_text(title), self.level));
        }
        for line in &self.lines {
            out.push(match line {
                Line::Text(text) => escape_text(text),
                Line::KeyValue(k, v) => key_value(&escape_text(k), escape_text(v)),
                Line::Bullet(item) => list_item(&escape_text(item)),
                Line::Numbered(n, item) => numbered_item(*n, &escape_text(item)),
            });
        }
        out.join("\n")
    }

    /// Concatenated text of all lines, unescaped
    pub fn body(&self) -> String {
        self.lines
            .iter()
            .map(|line| match line {
                Line::Text(t) => t.clone(),
                Line::KeyValue(k, v) => key_value(k, v),
                Line::Bullet(item) => list_item(item),
                Line::Numbered(n, item) => numbered_item(*n, item),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn parse_header(line: &str) -> Option<(String, Level)> {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix(HEADER) {
        let title = rest.strip_suffix(HEADER).unwrap_or(rest);
        return Some((unescape_text(title.trim()), Level::Main));
    }
    if let Some(rest) = trimmed.strip_prefix(SUBSECTION) {
        let title = rest.strip_suffix(SUBSECTION).unwrap_or(rest);
        return Some((unescape_text(title.trim()), Level::Sub));
    }
    None
}

fn parse_line(line: &str) -> Line {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix(LIST_ITEM) {
        return Line::Bullet(unescape_text(rest.trim()));
    }
    if let Some(caps) = numbered_item_regex().captures(trimmed) {
        if let (Some(all), Some(n)) = (caps.get(0), caps.get(1)) {
            if let Ok(number) = n.as_str().parse() {
                return Line::Numbered(number, unescape_text(trimmed[all.end()..].trim()));
            }
        }
    }
    if let Some((key, value)) = trimmed.split_once(KEY_VALUE) {
        let (key, value) = (key.trim(), value.trim());
        if !key.is_empty()
            && !value.is_empty()
            && key.split_whitespace().count() <= MAX_KEY_WORDS
        {
            return Line::KeyValue(unescape_text(key), unescape_text(value));
        }
    }
    Line::Text(unescape_text(line))
}

/// Split text into sections. Never fails: anything unrecognised becomes a
/// `Line::Text`, and text before the first header lands in an untitled
/// section. Blank lines are dropped.
pub fn decode_sections(text: &str) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();

    for line in text.lines() {
        if let Some((title, level)) = parse_header(line) {
            sections.push(Section {
                title: Some(title),
                level,
                lines: Vec::new(),
            });
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        if sections.is_empty() {
            sections.push(Section {
                title: None,
                level: Level::Main,
                lines: Vec::new(),
            });
        }
        if let Some(current) = sections.last_mut() {
            current.lines.push(parse_line(line));
        }
    }

    sections
}
