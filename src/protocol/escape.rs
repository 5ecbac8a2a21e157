//! Marker-safe escaping for free text embedded in protocol documents
//!
//! Any `-` or `=` directly following the same character is prefixed with a
//! backslash, and backslashes themselves are doubled. Escaped text therefore
//! never contains `---` or `===`, and `unescape_text` restores the input
//! exactly.

const ESCAPE: char = '\\';

fn is_marker_char(c: char) -> bool {
    c == '-' || c == '='
}

/// Escape text so it cannot produce header or subsection markers
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous: Option<char> = None;

    for c in text.chars() {
        if c == ESCAPE || (is_marker_char(c) && previous == Some(c)) {
            out.push(ESCAPE);
        }
        out.push(c);
        previous = Some(c);
    }

    out
}

/// Inverse of [`escape_text`]. A trailing lone backslash is kept as-is.
pub fn unescape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c == ESCAPE {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push(ESCAPE),
            }
        } else {
            out.push(c);
        }
    }

    out
}
