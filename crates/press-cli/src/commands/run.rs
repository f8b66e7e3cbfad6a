//! Run command implementation
//!
//! Loads a migration config, applies the command-line overrides and runs the
//! migration over the configured store.

use std::path::Path;

use colored::Colorize;

use press_core::{DocumentOutcome, MigrationConfig, Partition, RunSummary, Runner};
use press_store::{DirectoryStore, JsonLinesLog, MemoryLog, RunLog};

use super::print_diff;
use crate::error::{CliError, Result};

/// Command-line overrides for a configured run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub worker: Option<Partition>,
    pub flag: Option<String>,
    pub json: bool,
}

/// Run the migration described by `config_path`.
///
/// Returns a user error when any document failed, after the summary has
/// been printed.
pub fn run_migration(config_path: &Path, options: &RunOptions) -> Result<()> {
    let mut config = MigrationConfig::load(config_path)?;
    if options.dry_run {
        config.dry_run = true;
    }
    if let Some(worker) = options.worker {
        config.partition = worker;
    }

    let mut runner = Runner::from_config(&config, &crate::rules::registry())?;
    if let Some(flag) = &options.flag {
        runner = runner.with_skip_flag(flag);
    }

    let mut store = DirectoryStore::open(&config.store)?;
    let mut log: Box<dyn RunLog> = match &config.log {
        Some(path) => Box::new(JsonLinesLog::new(path)),
        None => Box::new(MemoryLog::new()),
    };

    tracing::info!(
        name = %config.name,
        store = %config.store.display(),
        partition = %config.partition,
        dry_run = config.dry_run,
        "starting run"
    );
    let summary = runner.run(&mut store, log.as_mut())?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary, config.partition);
    }

    if summary.has_failures() {
        let noun = if summary.failed == 1 { "document" } else { "documents" };
        return Err(CliError::user(format!(
            "{} {noun} failed; they were left unchanged",
            summary.failed
        )));
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, partition: Partition) {
    let title = if summary.dry_run { "Dry run" } else { "Run" };
    println!(
        "{} {} (worker {})",
        title.blue().bold(),
        summary.name.yellow(),
        partition.to_string().cyan()
    );

    for report in &summary.documents {
        match &report.outcome {
            DocumentOutcome::Skipped | DocumentOutcome::Unchanged => {}
            DocumentOutcome::Changed { edits } => {
                println!(
                    "  {} {} ({edits} edits: {})",
                    "~".yellow(),
                    report.id,
                    report.rules.join(", ")
                );
            }
            DocumentOutcome::WouldChange { edits, diff } => {
                println!(
                    "  {} {} ({edits} edits: {})",
                    "~".yellow(),
                    report.id,
                    report.rules.join(", ")
                );
                print_diff(diff);
            }
            DocumentOutcome::Failed { reason } => {
                println!("  {} {}: {reason}", "!".red(), report.id);
            }
        }
    }

    println!();
    let status = if summary.has_failures() {
        "FAILED".red().bold()
    } else {
        "OK".green().bold()
    };
    println!("{status} {summary}");
}
