//! viewlineage CLI - column-level lineage for database views

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::Cli;
use commands::{lineage, views};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        cli::Commands::Lineage(args) => lineage::execute(args, &cli.global),
        cli::Commands::Views(args) => views::execute(args, &cli.global),
    }
}
