//! Preview command implementation
//!
//! Applies a migration's rules to a single body file and prints the diff.
//! Nothing is written.

use std::fs;
use std::path::Path;

use colored::Colorize;

use press_core::{MigrationConfig, compile_rules, diff, migrate_body};

use super::print_diff;
use crate::error::Result;

pub fn run_preview(config_path: &Path, file: &Path) -> Result<()> {
    let config = MigrationConfig::load(config_path)?;
    let rules = compile_rules(&config.rules, &crate::rules::registry())?;
    let body = fs::read_to_string(file)?;
    let result = migrate_body(&body, &rules)?;

    for ambiguity in &result.ambiguities {
        println!(
            "{} kept malformed marker as text at byte {}",
            "warning:".yellow().bold(),
            ambiguity.offset
        );
    }

    if !result.changed {
        println!("{} No rule changes this body.", "OK".green().bold());
        return Ok(());
    }

    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());
    print_diff(&diff::unified_diff(&name, &body, &result.body));

    println!();
    for outcome in result.report.outcomes.iter().filter(|o| o.edits > 0) {
        println!("  {} {} edits", outcome.rule.cyan(), outcome.edits);
    }
    for url in &result.new_media {
        println!("  {} new media {url}", "+".green());
    }
    Ok(())
}
