use std::{
    collections::BTreeSet,
    fmt,
    path::{Path, PathBuf},
};

use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::warn;

use super::metadata;

/// One parsed, versioned note.
///
/// Entries are immutable once constructed. Identity comes from an explicit
/// `id` directive when present, otherwise from a SHA-256 digest of the raw
/// text; in the derived case the id directive is appended to the stored text
/// so that re-parsing the stored text yields the same identifier.
#[derive(Debug, Clone)]
pub struct Entry {
    id: String,
    origin: PathBuf,
    text: String,
    position: usize,
    tags: Vec<String>,
    related_ids: BTreeSet<String>,
    /// Always starts with the self-reference pattern matching `$<id>`.
    related_patterns: Vec<Regex>,
}

impl Entry {
    /// Parses `text` into an entry.
    ///
    /// `position` is the zero-based ordinal of the entry within its source
    /// file at load time; a higher position means a more recently authored
    /// entry.
    #[must_use]
    pub fn new(origin: PathBuf, text: impl Into<String>, position: usize) -> Self {
        let mut text = text.into();
        let meta = metadata::extract(&text);

        let id = match meta
            .get("id")
            .and_then(|values| values.last())
            .filter(|value| !value.is_empty())
        {
            Some(explicit) => explicit.clone(),
            None => {
                let digest = format!("{:x}", Sha256::digest(text.as_bytes()));
                text.push('\n');
                text.push_str(&metadata::directive("id", &digest));
                digest
            }
        };

        let tags = meta
            .get("tags")
            .into_iter()
            .flatten()
            .flat_map(|value| value.split(','))
            .filter(|tag| !tag.is_empty())
            .map(ToString::to_string)
            .collect();

        let mut related_ids = BTreeSet::new();

        // An entry is related to anything that writes `$<this id>` in its body.
        let self_pattern = Regex::new(&format!(r"\${}", regex::escape(&id)))
            .expect("escaped literal is a valid pattern");
        let mut related_patterns = vec![self_pattern];

        let related_tokens = meta
            .get("related")
            .into_iter()
            .flatten()
            .flat_map(|value| value.split(','))
            .filter(|token| !token.is_empty());

        for token in related_tokens {
            if let Some(id) = token.strip_prefix("id=") {
                related_ids.insert(id.to_string());
            } else if let Some(pattern) = token.strip_prefix("regexp=") {
                match Regex::new(pattern) {
                    Ok(regex) => related_patterns.push(regex),
                    Err(error) => warn!(%pattern, %error, "skipping unparseable relation pattern"),
                }
            } else {
                warn!(%token, "skipping relation token with unrecognized prefix");
            }
        }

        Self {
            id,
            origin,
            text,
            position,
            tags,
            related_ids,
            related_patterns,
        }
    }

    /// The entry's stable identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The file this entry was loaded from, or will be appended to.
    #[must_use]
    pub fn origin(&self) -> &Path {
        &self.origin
    }

    /// The full entry body, including directive lines.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Zero-based ordinal within the source file at load time.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Tags declared via the `tags` directive.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Identifiers declared related via `id=` tokens.
    #[must_use]
    pub const fn related_ids(&self) -> &BTreeSet<String> {
        &self.related_ids
    }

    /// The first line of the entry text.
    #[must_use]
    pub fn title(&self) -> &str {
        self.text.lines().next().unwrap_or_default()
    }

    /// Whether this entry and `other` are related.
    ///
    /// The relation is symmetric: it holds if either entry declares the
    /// other's id, or if either entry's patterns match the other's text.
    #[must_use]
    pub fn is_related(&self, other: &Self) -> bool {
        related_via(self, other) || related_via(other, self)
    }
}

fn related_via(declaring: &Entry, subject: &Entry) -> bool {
    declaring.related_ids.contains(subject.id())
        || declaring
            .related_patterns
            .iter()
            .any(|pattern| pattern.is_match(subject.text()))
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
