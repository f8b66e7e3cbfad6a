//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use press_core::Partition;

/// Press - Rewrite stored page bodies block by block
#[derive(Parser, Debug)]
#[command(name = "press")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run a migration over its document store
    ///
    /// Examples:
    ///   press run migration.toml               # Rewrite every document
    ///   press run migration.toml --dry-run     # Show diffs, write nothing
    ///   press run migration.toml --worker 2/8  # Third of eight workers
    Run {
        /// Migration config (TOML, JSON or YAML)
        #[arg(env = "PRESS_CONFIG")]
        config: PathBuf,

        /// Preview changes without writing bodies or flags
        #[arg(long)]
        dry_run: bool,

        /// Process only this worker's share of documents, as `index/count`
        #[arg(long, value_name = "I/N")]
        worker: Option<Partition>,

        /// Override the skip flag, e.g. to rerun over processed documents
        #[arg(long)]
        flag: Option<String>,

        /// Output the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a migration config and compile its rules
    ///
    /// Rules with `action = "custom"` may name drop-empty-paragraphs or
    /// drop-trailing-separators.
    Check {
        /// Migration config (TOML, JSON or YAML)
        #[arg(env = "PRESS_CONFIG")]
        config: PathBuf,
    },

    /// Show a migration's effect on one body file without touching the store
    Preview {
        /// Migration config (TOML, JSON or YAML)
        config: PathBuf,

        /// Body file to rewrite
        file: PathBuf,
    },

    /// List the top-level blocks of a body file
    Inspect {
        /// Body file to parse
        file: PathBuf,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}
