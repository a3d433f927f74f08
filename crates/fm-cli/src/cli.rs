//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Feathermigrate - versioned schema migrations for DuckDB and SQLite
#[derive(Parser, Debug)]
#[command(name = "fm")]
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

    /// Connection descriptor, e.g. sqlite3://app.db
    #[arg(short, long, global = true, env = "FM_DATABASE_URL")]
    pub url: Option<String>,

    /// Override the migrations directory
    #[arg(short, long, global = true)]
    pub path: Option<String>,

    /// Path to fm.yml (default: ./fm.yml when present)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Named target from fm.yml
    #[arg(short, long, global = true)]
    pub target: Option<String>,

    /// Abort when a single step runs longer than this many seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an empty up/down migration pair
    Create(CreateArgs),

    /// Apply all pending migrations
    Up,

    /// Roll back all applied migrations
    Down,

    /// Roll back and re-apply the latest migration
    Redo,

    /// Roll back everything, then apply everything
    Reset,

    /// Apply (N > 0) or roll back (N < 0) N migrations
    Migrate(MigrateArgs),

    /// Migrate to a specific version (0 rolls back everything)
    Goto(GotoArgs),

    /// Print the current version
    Version,

    /// List migrations and whether they are applied
    Versions(VersionsArgs),
}

/// Arguments for the create command
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Migration name; spaces become underscores
    pub name: String,

    /// File extension (default: from fm.yml, else sql)
    #[arg(long)]
    pub ext: Option<String>,

    /// Explicit version instead of the current UTC timestamp
    #[arg(long)]
    pub version: Option<u64>,
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Number of steps; negative rolls back
    #[arg(allow_negative_numbers = true)]
    pub steps: i64,
}

/// Arguments for the goto command
#[derive(Args, Debug)]
pub struct GotoArgs {
    /// Target version
    pub version: u64,
}

/// Arguments for the versions command
#[derive(Args, Debug)]
pub struct VersionsArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: VersionsOutput,
}

/// Versions output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionsOutput {
    /// Human-readable table
    Table,
    /// JSON array
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
