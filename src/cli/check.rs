use std::{path::PathBuf, process};

use clap::Parser;
use notelog::{Resolver, Store};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser, Default)]
#[command(about = "Verify that every inline reference resolves")]
pub struct Check {
    /// Suppress per-reference output
    #[arg(long, short)]
    quiet: bool,
}

impl Check {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, files: Vec<PathBuf>) -> anyhow::Result<()> {
        let store = Store::load(&files)?;
        let resolver = Resolver::new(&store);

        let mut broken = 0usize;
        for entry in store.latest_entries() {
            let expansion = resolver.expand(entry.text());
            for id in &expansion.unresolved {
                broken += 1;
                if !self.quiet {
                    println!(
                        "{}",
                        format!("{}: unresolved reference '{id}'", entry.id()).warning()
                    );
                }
            }
        }

        if broken == 0 {
            if !self.quiet {
                println!("{}", "All references resolve.".success());
            }
            return Ok(());
        }

        if !self.quiet {
            println!();
            println!("{broken} unresolved reference(s) found");
        }

        // Non-zero exit so CI can gate on broken references.
        process::exit(2);
    }
}
