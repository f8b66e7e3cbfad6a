//! Check command implementation
//!
//! Validates a migration config without processing any document.

use std::path::Path;

use colored::Colorize;

use press_core::{MigrationConfig, compile_rules};
use press_store::{DirectoryStore, DocumentStore};

use crate::error::Result;

/// Load the config, compile every rule and count the documents in scope.
pub fn run_check(config_path: &Path) -> Result<()> {
    let config = MigrationConfig::load(config_path)?;
    let rules = compile_rules(&config.rules, &crate::rules::registry())?;
    let store = DirectoryStore::open(&config.store)?;
    let owned = store
        .ids()?
        .iter()
        .filter(|id| config.partition.owns(id))
        .count();

    println!(
        "{} {} ({} rules, {owned} documents for worker {})",
        "OK".green().bold(),
        config.name.yellow(),
        rules.len(),
        config.partition.to_string().cyan()
    );
    for spec in &config.rules {
        println!("  {} {}", spec.action().cyan(), spec.name());
    }
    Ok(())
}
