use std::path::PathBuf;

use clap::Parser;
use notelog::{Resolver, Store, DELIMITER};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Display an entry, with inline references expanded")]
pub struct Show {
    /// The identifier of the entry to display
    id: String,

    /// Print the stored text without expanding references
    #[arg(long)]
    raw: bool,

    /// Print every revision, oldest first
    #[arg(long)]
    history: bool,
}

impl Show {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, files: Vec<PathBuf>) -> anyhow::Result<()> {
        let store = Store::load(&files)?;

        let Some(revisions) = store.revisions(&self.id) else {
            eprintln!("Entry {} not found", self.id);
            std::process::exit(1);
        };

        let shown: Vec<_> = if self.history {
            revisions.iter().collect()
        } else {
            revisions.iter().rev().take(1).collect()
        };

        let resolver = Resolver::new(&store);
        for (index, revision) in shown.iter().enumerate() {
            if index > 0 {
                println!("{DELIMITER}");
            }

            if self.raw {
                println!("{revision}");
                continue;
            }

            let expansion = resolver.expand(revision.text());
            println!("{}", expansion.text);
            for id in &expansion.unresolved {
                eprintln!("{}", format!("unresolved reference: {id}").warning());
            }
        }

        Ok(())
    }
}
