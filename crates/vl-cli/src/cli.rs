//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// viewlineage - column-level lineage for database views
#[derive(Parser, Debug)]
#[command(name = "vl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the config file (default: viewlineage.yml in the current directory)
    #[arg(short, long, global = true, env = "VIEWLINEAGE_CONFIG")]
    pub config: Option<String>,

    /// Override the database path from the config
    #[arg(short, long, global = true)]
    pub database: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build column-level lineage for every selected view
    Lineage(LineageArgs),

    /// List views and whether their definitions are available
    Views(ViewsArgs),
}

/// Arguments for the lineage command
#[derive(Args, Debug)]
pub struct LineageArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub output: LineageOutput,

    /// Schema allow pattern (repeatable, replaces the config's allow list)
    #[arg(short, long)]
    pub schema: Vec<String>,

    /// View allow pattern (repeatable, replaces the config's allow list)
    #[arg(long)]
    pub view: Vec<String>,
}

/// Lineage output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineageOutput {
    /// Lineage document with emitted facts and the build report
    Json,
    /// Human-readable table of column edges
    Table,
}

/// Arguments for the views command
#[derive(Args, Debug)]
pub struct ViewsArgs {
    /// Schema allow pattern (repeatable, replaces the config's allow list)
    #[arg(short, long)]
    pub schema: Vec<String>,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
