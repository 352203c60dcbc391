//! bibtree CLI: categorized bibliography builder.
//!
//! Files BibTeX entries under a hierarchical category taxonomy and renders
//! them as a sectioned LaTeX document.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
