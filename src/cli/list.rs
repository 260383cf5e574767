use std::path::PathBuf;

use clap::Parser;
use notelog::Store;
use tracing::instrument;

use super::terminal::Colorize;

/// The tag that hides an entry from the default listing.
const DONE_TAG: &str = "Done";

#[derive(Debug, Parser, Default)]
#[command(about = "List the latest revision of every entry")]
pub struct List {
    /// Include entries tagged 'Done'
    #[arg(long, short)]
    all: bool,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl List {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, files: Vec<PathBuf>) -> anyhow::Result<()> {
        let store = Store::load(&files)?;

        let entries: Vec<_> = store
            .latest_entries()
            .into_iter()
            .filter(|entry| self.all || !entry.tags().iter().any(|tag| tag == DONE_TAG))
            .collect();

        if entries.is_empty() {
            println!("No entries found yet. Create one with 'notelog new'.");
            return Ok(());
        }

        match self.format {
            OutputFormat::Json => Self::output_json(&entries)?,
            OutputFormat::Table => Self::output_table(&entries),
        }

        Ok(())
    }

    fn output_table(entries: &[&notelog::Entry]) {
        for entry in entries {
            let tags = if entry.tags().is_empty() {
                String::new()
            } else {
                format!("  [{}]", entry.tags().join(","))
            };
            println!("{}  {}{}", entry.id().dim(), entry.title(), tags.dim());
        }
    }

    fn output_json(entries: &[&notelog::Entry]) -> anyhow::Result<()> {
        use serde_json::json;

        let items: Vec<_> = entries
            .iter()
            .map(|entry| {
                json!({
                    "id": entry.id(),
                    "title": entry.title(),
                    "tags": entry.tags(),
                    "origin": entry.origin().display().to_string(),
                    "position": entry.position(),
                })
            })
            .collect();

        println!("{}", serde_json::to_string_pretty(&json!({ "entries": items }))?);
        Ok(())
    }
}
