//! Command implementations for press-cli

pub mod check;
pub mod inspect;
pub mod preview;
pub mod run;

pub use check::run_check;
pub use inspect::run_inspect;
pub use preview::run_preview;
pub use run::{RunOptions, run_migration};

use colored::Colorize;

/// Print a unified diff with added lines in green and removed lines in red.
pub(crate) fn print_diff(diff: &str) {
    for line in diff.lines() {
        if line.starts_with("+++") || line.starts_with("---") {
            println!("{}", line.bold());
        } else if line.starts_with("@@") {
            println!("{}", line.cyan());
        } else if line.starts_with('+') {
            println!("{}", line.green());
        } else if line.starts_with('-') {
            println!("{}", line.red());
        } else {
            println!("{line}");
        }
    }
}
