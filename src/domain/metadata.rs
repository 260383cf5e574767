//! Metadata directive codec.
//!
//! A directive is a single line of the form `[_metadata_:<key>]:# "<value>"`.
//! The syntax doubles as an invisible markdown link reference, so directive
//! lines disappear when the entry text is rendered by a markdown viewer.
//! Lines that merely resemble a directive (unbalanced quotes, bad key
//! characters) are ordinary text and are never an error.

use std::{collections::HashMap, sync::LazyLock};

use regex::Regex;

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\[_metadata_:(\w+)\]:# "(.*)"$"#).expect("directive pattern is valid")
});

/// Parses a single line as a metadata directive.
///
/// Returns the key and value if the line matches the directive grammar
/// exactly, or `None` for any other line.
#[must_use]
pub fn parse_line(line: &str) -> Option<(&str, &str)> {
    let captures = DIRECTIVE.captures(line)?;
    // Indices 1 and 2 are guaranteed by the pattern.
    Some((
        captures.get(1).expect("key group").as_str(),
        captures.get(2).expect("value group").as_str(),
    ))
}

/// Collects all directive values in `text`, keyed by directive key.
///
/// Values for a repeated key accumulate in declaration order. Non-directive
/// lines are ignored.
#[must_use]
pub fn extract(text: &str) -> HashMap<String, Vec<String>> {
    let mut out: HashMap<String, Vec<String>> = HashMap::new();

    for line in text.lines() {
        if let Some((key, value)) = parse_line(line) {
            out.entry(key.to_string()).or_default().push(value.to_string());
        }
    }

    out
}

/// Returns `text` with every directive line for `key` deleted.
///
/// All other lines are preserved verbatim, including blank lines and
/// directives for other keys.
#[must_use]
pub fn remove(text: &str, key: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut first = true;

    for line in text.lines() {
        if parse_line(line).is_some_and(|(k, _)| k == key) {
            continue;
        }
        if !first {
            out.push('\n');
        }
        out.push_str(line);
        first = false;
    }

    out
}

/// Formats a directive line for `key` carrying `value`.
#[must_use]
pub fn directive(key: &str, value: &str) -> String {
    format!("[_metadata_:{key}]:# \"{value}\"")
}
