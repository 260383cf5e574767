use std::{
    fs::OpenOptions,
    io::{Read, Write},
    path::PathBuf,
};

mod check;
mod list;
mod show;
mod terminal;

use check::Check;
use clap::ArgAction;
use list::List;
use notelog::{metadata, Entry, Store, DELIMITER};
use show::Show;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Note file to load (repeatable; load order matters)
    #[arg(short, long = "file", value_name = "FILE", global = true)]
    files: Vec<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let files = dedup(self.files);
        if files.is_empty() {
            anyhow::bail!("no note files given (pass one or more with --file)");
        }

        self.command
            .unwrap_or_else(|| Command::List(List::default()))
            .run(files)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

/// Removes duplicate paths while preserving first-seen order.
fn dedup(files: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = Vec::with_capacity(files.len());
    for file in files {
        if !seen.contains(&file) {
            seen.push(file);
        }
    }
    seen
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// List the latest revision of every entry (default)
    List(List),

    /// Display an entry with inline references expanded
    Show(Show),

    /// List entries related to a given entry
    Related(Related),

    /// Append a new entry to a note file
    New(New),

    /// Verify that every inline reference resolves
    Check(Check),
}

impl Command {
    fn run(self, files: Vec<PathBuf>) -> anyhow::Result<()> {
        match self {
            Self::List(command) => command.run(files)?,
            Self::Show(command) => command.run(files)?,
            Self::Related(command) => command.run(files)?,
            Self::New(command) => command.run(files)?,
            Self::Check(command) => command.run(files)?,
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Related {
    /// The identifier of the entry to find relations for
    id: String,
}

impl Related {
    #[instrument(level = "debug", skip(self))]
    fn run(self, files: Vec<PathBuf>) -> anyhow::Result<()> {
        use terminal::Colorize;

        let store = Store::load(&files)?;

        let Some(entry) = store.latest(&self.id) else {
            eprintln!("Entry {} not found", self.id);
            std::process::exit(1);
        };

        let related = store.related_to(entry);
        if related.is_empty() {
            println!("No related entries.");
            return Ok(());
        }

        for other in related {
            println!("{}  {}", other.id().dim(), other.title());
        }

        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct New {
    /// The entry body; read from stdin when omitted
    #[arg(long, short)]
    body: Option<String>,

    /// Identifier for the entry (default: a fresh UUID)
    #[arg(long)]
    id: Option<String>,

    /// Comma-separated tags
    #[arg(long, short)]
    tags: Option<String>,
}

impl New {
    #[instrument(level = "debug", skip(self))]
    fn run(self, files: Vec<PathBuf>) -> anyhow::Result<()> {
        let target = files.first().cloned().expect("caller validated file list");
        let mut store = Store::load(&files)?;

        let body = match self.body {
            Some(body) => body,
            None => {
                let mut buffer = String::new();
                std::io::stdin().read_to_string(&mut buffer)?;
                buffer
            }
        };
        let body = body.trim();
        anyhow::ensure!(!body.is_empty(), "entry body is empty");

        let id = self
            .id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut text = body.to_string();
        text.push('\n');
        text.push_str(&metadata::directive("id", &id));
        if let Some(tags) = self.tags.as_deref().filter(|tags| !tags.is_empty()) {
            text.push('\n');
            text.push_str(&metadata::directive("tags", tags));
        }

        // Write the file first; the in-memory index is only updated once the
        // append has succeeded.
        let mut file = OpenOptions::new().append(true).open(&target)?;
        write!(file, "\n{DELIMITER}\n{text}")?;

        let position = store.next_position(&target);
        store.append(Entry::new(target, text, position));

        println!("Added entry {id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use tempfile::NamedTempFile;

    use super::*;

    fn note_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn new_appends_entry_to_file() {
        let file = note_file("A\n[_metadata_:id]:# \"1\"");
        let path = file.path().to_path_buf();

        let new = New {
            body: Some("Fresh entry".to_string()),
            id: Some("n1".to_string()),
            tags: Some("work".to_string()),
        };
        new.run(vec![path.clone()]).expect("new should succeed");

        let store = Store::load(&[path]).expect("reload should succeed");
        let entry = store.latest("n1").expect("appended entry should load");
        assert_eq!(entry.title(), "Fresh entry");
        assert_eq!(entry.tags(), ["work"]);
        assert_eq!(entry.position(), 1);
    }

    #[test]
    fn new_with_existing_id_becomes_a_revision() {
        let file = note_file("A\n[_metadata_:id]:# \"1\"");
        let path = file.path().to_path_buf();

        let new = New {
            body: Some("A, revised".to_string()),
            id: Some("1".to_string()),
            tags: None,
        };
        new.run(vec![path.clone()]).expect("new should succeed");

        let store = Store::load(&[path]).expect("reload should succeed");
        assert_eq!(store.revisions("1").unwrap().len(), 2);
        assert_eq!(store.latest("1").unwrap().title(), "A, revised");
    }

    #[test]
    fn new_rejects_empty_body() {
        let file = note_file("A\n[_metadata_:id]:# \"1\"");

        let new = New {
            body: Some("   \n ".to_string()),
            id: None,
            tags: None,
        };
        assert!(new.run(vec![file.path().to_path_buf()]).is_err());
    }

    #[test]
    fn list_run_succeeds() {
        let file = note_file("A\n[_metadata_:id]:# \"1\"\n---\nB\n[_metadata_:id]:# \"2\"");
        List::default()
            .run(vec![file.path().to_path_buf()])
            .expect("list should succeed");
    }

    #[test]
    fn check_run_succeeds_when_references_resolve() {
        let file = note_file("A\n[_metadata_:id]:# \"1\"\n---\nB sees {1}\n[_metadata_:id]:# \"2\"");
        Check::default()
            .run(vec![file.path().to_path_buf()])
            .expect("check should succeed");
    }

    #[test]
    fn dedup_preserves_first_seen_order() {
        let files = vec![
            PathBuf::from("a.md"),
            PathBuf::from("b.md"),
            PathBuf::from("a.md"),
        ];
        assert_eq!(dedup(files), [PathBuf::from("a.md"), PathBuf::from("b.md")]);
    }
}
