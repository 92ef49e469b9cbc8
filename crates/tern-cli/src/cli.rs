//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Tern - apply ordered SQL migrations and track them in a ledger
#[derive(Parser, Debug)]
#[command(name = "tern")]
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

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override target (database connection); falls back to TERN_TARGET
    #[arg(short, long, global = true)]
    pub target: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scaffold a new Tern project
    Init(InitArgs),

    /// Apply pending migrations in one transaction
    Migrate(MigrateArgs),

    /// Show applied and pending migrations
    Status(StatusArgs),

    /// List ledger entries for a runner
    History(HistoryArgs),
}

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project name (also the new directory name)
    pub name: String,

    /// Database file path written to tern.yml
    #[arg(long, default_value = "dev.duckdb")]
    pub database_path: String,
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Runner identifier (catalogue.yml identifier still takes precedence)
    #[arg(short, long)]
    pub identifier: Option<String>,

    /// Only migrate these nodes (repeatable or comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub node: Vec<String>,

    /// Leave these migrations out of the run (repeatable or comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Stop after this migration has been applied
    #[arg(long, conflicts_with = "baseline")]
    pub until: Option<String>,

    /// Skip these migrations without recording them
    #[arg(long, value_delimiter = ',', conflicts_with = "baseline")]
    pub skip: Vec<String>,

    /// Record every pending migration without running its script
    #[arg(long)]
    pub baseline: bool,

    /// Error policy: stop, continue, mark-anyway-and-continue, mark-anyway-and-stop
    #[arg(long)]
    pub on_error: Option<String>,

    /// Commit policy: on-success, always, never
    #[arg(long, conflicts_with = "dry_run")]
    pub commit: Option<String>,

    /// Run every script, then roll back
    #[arg(long)]
    pub dry_run: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Runner identifier (catalogue.yml identifier still takes precedence)
    #[arg(short, long)]
    pub identifier: Option<String>,

    /// Only show these nodes (repeatable or comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub node: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the history command
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Runner identifier (catalogue.yml identifier still takes precedence)
    #[arg(short, long)]
    pub identifier: Option<String>,

    /// Print the recorded script for each entry
    #[arg(long)]
    pub show_script: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Output formats shared by reporting commands
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
