//! The append-only entry store.
//!
//! A [`Store`] is built once from an ordered list of note files and holds
//! every revision of every entry, grouped by identifier. After construction
//! it changes only through [`Store::append`], which mirrors a physical append
//! to one of the note files.

use std::{
    cmp::Reverse,
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::{Entry, DELIMITER};

/// An error encountered while reading note files at construction time.
///
/// Construction is all-or-nothing: a store is never returned partially
/// populated.
#[derive(Debug, thiserror::Error)]
#[error("failed to read note file '{}'", path.display())]
pub struct LoadError {
    /// The file that could not be read.
    path: PathBuf,
    #[source]
    source: io::Error,
}

impl LoadError {
    /// The file that could not be read.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Splits raw file content into trimmed entry fragments.
///
/// The delimiter is any line whose trimmed content is exactly
/// [`DELIMITER`](crate::DELIMITER). Fragments are trimmed of surrounding
/// whitespace and empty fragments (from leading, trailing, or doubled
/// delimiters) are discarded.
#[must_use]
pub fn split_entries(text: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line.trim() == DELIMITER {
            fragments.push(std::mem::take(&mut current));
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    fragments.push(current);

    fragments
        .iter()
        .map(|fragment| fragment.trim())
        .filter(|fragment| !fragment.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// An in-memory index of every entry revision, keyed by identifier.
#[derive(Debug, Default)]
pub struct Store {
    /// Files in load order. Used to break position ties between files.
    source_files: Vec<PathBuf>,
    /// Revision history per id, oldest first. Never empty once the id exists.
    entries: HashMap<String, Vec<Entry>>,
}

impl Store {
    /// Reads and indexes every file in `files`, in order.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if any file cannot be read. No partially
    /// loaded store is ever returned.
    pub fn load(files: &[PathBuf]) -> Result<Self, LoadError> {
        let mut store = Self {
            source_files: files.to_vec(),
            entries: HashMap::new(),
        };

        for file in files {
            let content = fs::read_to_string(file).map_err(|source| LoadError {
                path: file.clone(),
                source,
            })?;

            let fragments = split_entries(&content);
            info!(file = %file.display(), count = fragments.len(), "loaded entries");

            for (position, fragment) in fragments.into_iter().enumerate() {
                let entry = Entry::new(file.clone(), fragment, position);
                debug!(id = entry.id(), position, "indexed entry");
                store.insert(entry);
            }
        }

        Ok(store)
    }

    fn insert(&mut self, entry: Entry) {
        self.entries
            .entry(entry.id().to_string())
            .or_default()
            .push(entry);
    }

    /// Records one new revision.
    ///
    /// The caller is responsible for having already appended
    /// `"\n---\n" + entry.text()` to `entry.origin()`; if that write fails,
    /// this method must not be called, so the index stays consistent with
    /// the files.
    pub fn append(&mut self, entry: Entry) {
        debug!(id = entry.id(), "appending revision");
        self.insert(entry);
    }

    /// The full revision history for `id`, oldest first.
    #[must_use]
    pub fn revisions(&self, id: &str) -> Option<&[Entry]> {
        self.entries.get(id).map(Vec::as_slice)
    }

    /// The latest revision of `id`.
    #[must_use]
    pub fn latest(&self, id: &str) -> Option<&Entry> {
        self.entries.get(id).and_then(|revisions| revisions.last())
    }

    /// The latest revision of every known entry, most recently authored
    /// first.
    ///
    /// Ordering is by descending position; entries from different files with
    /// equal positions keep their files' load order.
    #[must_use]
    pub fn latest_entries(&self) -> Vec<&Entry> {
        let mut latest: Vec<&Entry> = self
            .entries
            .values()
            .filter_map(|revisions| revisions.last())
            .collect();

        latest.sort_by_key(|entry| (Reverse(entry.position()), self.file_rank(entry.origin())));
        latest
    }

    /// Latest entries related to `entry`, excluding `entry` itself.
    #[must_use]
    pub fn related_to(&self, entry: &Entry) -> Vec<&Entry> {
        self.latest_entries()
            .into_iter()
            .filter(|other| other.id() != entry.id() && other.is_related(entry))
            .collect()
    }

    /// The position the next entry appended to `origin` should carry.
    #[must_use]
    pub fn next_position(&self, origin: &Path) -> usize {
        self.entries
            .values()
            .flatten()
            .filter(|entry| entry.origin() == origin)
            .map(|entry| entry.position() + 1)
            .max()
            .unwrap_or(0)
    }

    /// The files this store was loaded from, in load order.
    #[must_use]
    pub fn source_files(&self) -> &[PathBuf] {
        &self.source_files
    }

    /// The number of distinct entry identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn file_rank(&self, origin: &Path) -> usize {
        self.source_files
            .iter()
            .position(|file| file == origin)
            .unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn note_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn load_one(content: &str) -> (Store, NamedTempFile) {
        let file = note_file(content);
        let store = Store::load(&[file.path().to_path_buf()]).unwrap();
        (store, file)
    }

    #[test]
    fn split_on_delimiter_lines() {
        let fragments = split_entries("Hello\n---\nWorld");
        assert_eq!(fragments, ["Hello", "World"]);
    }

    #[test]
    fn split_trims_whitespace_and_drops_empty_fragments() {
        let fragments = split_entries("\n \nHello, there \n --- \n World\n \n");
        assert_eq!(fragments, ["Hello, there", "World"]);
    }

    #[test]
    fn split_tolerates_leading_and_trailing_delimiters() {
        let fragments = split_entries("---\nA\n---\n---\nB\n---\n");
        assert_eq!(fragments, ["A", "B"]);
    }

    #[test]
    fn split_ignores_inline_dashes() {
        let fragments = split_entries("Hello---World");
        assert_eq!(fragments, ["Hello---World"]);
    }

    #[test]
    fn split_round_trips_joined_entries() {
        let texts = ["first entry", "second\nentry", "third"];
        let joined = texts.join("\n---\n");
        assert_eq!(split_entries(&joined), texts);
    }

    #[test]
    fn load_indexes_entries_by_id() {
        let (store, _file) = load_one(concat!(
            "A\n[_metadata_:id]:# \"1\"\n",
            "---\n",
            "B\n[_metadata_:id]:# \"2\"\n",
        ));

        assert_eq!(store.len(), 2);
        assert_eq!(store.latest("1").unwrap().title(), "A");
        assert_eq!(store.latest("2").unwrap().title(), "B");
    }

    #[test]
    fn revisions_preserve_file_order() {
        let (store, _file) = load_one(concat!(
            "old text\n[_metadata_:id]:# \"x\"\n",
            "---\n",
            "other\n[_metadata_:id]:# \"y\"\n",
            "---\n",
            "new text\n[_metadata_:id]:# \"x\"\n",
        ));

        let revisions = store.revisions("x").unwrap();
        assert_eq!(revisions.len(), 2);
        assert_eq!(revisions[0].title(), "old text");
        assert_eq!(revisions[1].title(), "new text");
        assert_eq!(store.latest("x").unwrap().title(), "new text");
    }

    #[test]
    fn unknown_id_is_not_found() {
        let (store, _file) = load_one("A\n[_metadata_:id]:# \"1\"");
        assert!(store.latest("nope").is_none());
        assert!(store.revisions("nope").is_none());
    }

    #[test]
    fn missing_file_is_fatal() {
        let error = Store::load(&[PathBuf::from("/no/such/file.md")]).unwrap_err();
        assert_eq!(error.path(), Path::new("/no/such/file.md"));
    }

    #[test]
    fn latest_entries_orders_most_recent_first() {
        let (store, _file) = load_one(concat!(
            "first\n[_metadata_:id]:# \"1\"\n",
            "---\n",
            "second\n[_metadata_:id]:# \"2\"\n",
            "---\n",
            "third\n[_metadata_:id]:# \"3\"\n",
        ));

        let titles: Vec<_> = store
            .latest_entries()
            .iter()
            .map(|entry| entry.title())
            .collect();
        assert_eq!(titles, ["third", "second", "first"]);
    }

    #[test]
    fn latest_entries_breaks_position_ties_by_file_order() {
        let first = note_file("a\n[_metadata_:id]:# \"a\"");
        let second = note_file("b\n[_metadata_:id]:# \"b\"");
        let store =
            Store::load(&[first.path().to_path_buf(), second.path().to_path_buf()]).unwrap();

        let ids: Vec<_> = store
            .latest_entries()
            .iter()
            .map(|entry| entry.id())
            .collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn append_creates_and_extends_histories() {
        let (mut store, file) = load_one("A\n[_metadata_:id]:# \"1\"");
        let origin = file.path().to_path_buf();

        store.append(Entry::new(origin.clone(), "revised A\n[_metadata_:id]:# \"1\"", 1));
        store.append(Entry::new(origin, "fresh\n[_metadata_:id]:# \"2\"", 2));

        assert_eq!(store.revisions("1").unwrap().len(), 2);
        assert_eq!(store.latest("1").unwrap().title(), "revised A");
        assert_eq!(store.latest("2").unwrap().title(), "fresh");
    }

    #[test]
    fn next_position_follows_the_last_entry() {
        let (store, file) = load_one("A\n---\nB");
        assert_eq!(store.next_position(file.path()), 2);
        assert_eq!(store.next_position(Path::new("other.md")), 0);
    }

    #[test]
    fn related_to_excludes_the_entry_itself() {
        let (store, _file) = load_one(concat!(
            "A\n[_metadata_:id]:# \"a\"\n[_metadata_:related]:# \"id=b\"\n",
            "---\n",
            "B\n[_metadata_:id]:# \"b\"\n",
            "---\n",
            "C\n[_metadata_:id]:# \"c\"\n",
        ));

        let a = store.latest("a").unwrap();
        let related: Vec<_> = store.related_to(a).iter().map(|e| e.id()).collect();
        assert_eq!(related, ["b"]);
    }
}
