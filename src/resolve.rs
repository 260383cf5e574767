//! Expansion of inline references embedded in entry text.
//!
//! Two directive families are expanded, in a fixed order so that the short
//! syntax normalizes into the canonical form first:
//!
//! 1. `{<id>}` rewrites to `[_metadata_:link]:# "$<id>"` (purely syntactic).
//! 2. `link` directives become `[<first line of target>](<id>)`.
//! 3. `include` directives pull in a whole file, a single entry by id, or a
//!    line range of a file.
//!
//! Expansion is single-pass: included content is inserted as-is and is not
//! itself re-expanded, so reference cycles cannot loop. References that
//! cannot be resolved are collected and reported as data, never as an error.

use std::{fmt, fs, sync::LazyLock};

use regex::{Captures, Regex};
use tracing::debug;

use crate::{metadata, Store};

static SHORT_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([-0-9a-zA-Z]+)\}").expect("short link pattern is valid"));

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[_metadata_:link\]:# "([^"]*)""#).expect("link pattern is valid")
});

static INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[_metadata_:include\]:# "([^"]*)""#).expect("include pattern is valid")
});

/// A bare selector (one with no file part) looks like `$id`, or a line
/// number / line range.
static BARE_SELECTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\$.+|\d+(-\d+)?)$").expect("selector pattern is valid"));

/// The outcome of expanding one entry text.
#[derive(Debug)]
pub struct Expansion {
    /// Best-effort expanded text.
    pub text: String,
    /// Identifiers that could not be resolved, in occurrence order.
    pub unresolved: Vec<String>,
}

impl Expansion {
    /// Whether every reference resolved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Expands inline references by consulting a [`Store`] for link targets.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    store: &'a Store,
}

/// What part of an include target to pull in.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Selector {
    /// The entire file, trimmed.
    Whole,
    /// One entry, by id.
    Entry(String),
    /// Lines `[start, end)` of the file.
    Lines(usize, usize),
}

/// A normalized include target: a file part and a selector part.
#[derive(Debug)]
struct Target {
    file: String,
    selector: Selector,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.file)?;
        match &self.selector {
            Selector::Whole => Ok(()),
            Selector::Entry(id) => write!(f, "${id}"),
            Selector::Lines(start, end) => write!(f, "{start}-{end}"),
        }
    }
}

impl<'a> Resolver<'a> {
    /// Creates a resolver backed by `store`.
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Expands every reference in `text`.
    ///
    /// Returns the best-effort expanded text together with every identifier
    /// that could not be resolved. Unresolved links render as empty;
    /// unresolved includes render as an inline placeholder naming the
    /// reference. This never fails.
    #[must_use]
    pub fn expand(&self, text: &str) -> Expansion {
        let mut unresolved = Vec::new();

        let text = rewrite_short_links(text);
        let text = self.expand_links(&text, &mut unresolved);
        let text = self.expand_includes(&text, &mut unresolved);

        Expansion { text, unresolved }
    }

    fn expand_links(&self, text: &str, unresolved: &mut Vec<String>) -> String {
        LINK.replace_all(text, |captures: &Captures| {
            let target = &captures[1];
            let id = target.strip_prefix('$').unwrap_or(target);

            match self.store.latest(id) {
                Some(entry) => format!("[{}]({})", entry.title(), id),
                None => {
                    debug!(id, "link target not found");
                    unresolved.push(id.to_string());
                    String::new()
                }
            }
        })
        .into_owned()
    }

    fn expand_includes(&self, text: &str, unresolved: &mut Vec<String>) -> String {
        INCLUDE
            .replace_all(text, |captures: &Captures| {
                let target = normalize(&captures[1]);
                match self.resolve_include(&target) {
                    Some(content) => content,
                    None => {
                        debug!(target = %target, "include target not found");
                        unresolved.push(match &target.selector {
                            Selector::Entry(id) => id.clone(),
                            _ => target.to_string(),
                        });
                        format!("{{Unresolved reference \"{target}\"}}")
                    }
                }
            })
            .into_owned()
    }

    fn resolve_include(&self, target: &Target) -> Option<String> {
        match &target.selector {
            Selector::Entry(id) => {
                let entry = self.store.latest(id)?;
                let sanitized = metadata::remove(&metadata::remove(entry.text(), "id"), "tags");
                Some(sanitized.trim().to_string())
            }
            Selector::Whole => {
                let content = fs::read_to_string(&target.file).ok()?;
                Some(content.trim().to_string())
            }
            Selector::Lines(start, end) => {
                let content = fs::read_to_string(&target.file).ok()?;
                let lines: Vec<&str> = content
                    .lines()
                    .skip(*start)
                    .take(end.saturating_sub(*start))
                    .collect();
                Some(lines.join("\n"))
            }
        }
    }
}

/// Rewrites `{<id>}` tokens into canonical `link` directives.
///
/// No lookups happen here; the link expansion pass resolves the result.
fn rewrite_short_links(text: &str) -> String {
    SHORT_LINK
        .replace_all(text, |captures: &Captures| {
            metadata::directive("link", &format!("${}", &captures[1]))
        })
        .into_owned()
}

/// Normalizes an include target into its file and selector parts.
///
/// `file:selector` is split at the first colon; a bare `$id`, `n`, or
/// `start-end` is a selector with no file; anything else is a file with no
/// selector. A bare line number `n` normalizes to the range `n-n`, which
/// selects zero lines since the end is exclusive. That quirk is long-standing
/// observed behavior and is preserved deliberately.
fn normalize(raw: &str) -> Target {
    let (file, selector) = if let Some((file, selector)) = raw.split_once(':') {
        (file, selector)
    } else if BARE_SELECTOR.is_match(raw) {
        ("", raw)
    } else {
        (raw, "")
    };

    let selector = if selector.is_empty() {
        Selector::Whole
    } else if let Some(id) = selector.strip_prefix('$') {
        Selector::Entry(id.to_string())
    } else {
        match parse_range(selector) {
            Some((start, end)) => Selector::Lines(start, end),
            // Unparseable selectors resolve as a whole-file read of the
            // raw target, which reports them as unresolved.
            None => Selector::Whole,
        }
    };

    Target {
        file: file.to_string(),
        selector,
    }
}

fn parse_range(selector: &str) -> Option<(usize, usize)> {
    if let Some((start, end)) = selector.split_once('-') {
        Some((start.parse().ok()?, end.parse().ok()?))
    } else {
        let line: usize = selector.parse().ok()?;
        Some((line, line))
    }
}
