//! Press CLI
//!
//! Runs block-level content migrations over a directory of page bodies.

mod cli;
mod commands;
mod error;
mod logging;
mod rules;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use commands::RunOptions;
use error::{CliError, Result};

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose)
        .map_err(|e| CliError::user(format!("could not initialize logging: {e}")))?;
    tracing::debug!("Verbose mode enabled");

    match cli.command {
        Some(cmd) => execute_command(cmd),
        None => {
            println!("{} Block-level content migrations", "press".green().bold());
            println!();
            println!("Run {} for available commands.", "press --help".cyan());
            Ok(())
        }
    }
}

fn execute_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Run {
            config,
            dry_run,
            worker,
            flag,
            json,
        } => commands::run_migration(
            &config,
            &RunOptions {
                dry_run,
                worker,
                flag,
                json,
            },
        ),
        Commands::Check { config } => commands::run_check(&config),
        Commands::Preview { config, file } => commands::run_preview(&config, &file),
        Commands::Inspect { file, json } => commands::run_inspect(&file, json),
    }
}
