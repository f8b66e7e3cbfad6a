//! Inspect command implementation

use std::fs;
use std::path::Path;

use colored::Colorize;
use serde_json::json;

use press_blocks::{AmbiguityKind, Document};

use crate::error::Result;

/// Print the top-level block outline of a body file.
///
/// Also reports recovered markers and whether the body survives an
/// unmodified parse and serialize unchanged.
pub fn run_inspect(file: &Path, json: bool) -> Result<()> {
    let body = fs::read_to_string(file)?;
    let doc = Document::parse(&body);
    let round_trip = doc.serialize() == body;

    if json {
        let output = json!({
            "blocks": doc.blocks().iter().enumerate().map(|(index, block)| json!({
                "index": index,
                "kind": block.kind(),
                "attributes": block.attributes,
                "void": block.is_void(),
                "inner_bytes": block.inner_markup.len(),
            })).collect::<Vec<_>>(),
            "ambiguities": doc.ambiguities(),
            "round_trip": round_trip,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", doc.outline());
    for ambiguity in doc.ambiguities() {
        println!(
            "{} {} at byte {}",
            "warning:".yellow().bold(),
            describe(&ambiguity.kind),
            ambiguity.offset
        );
    }
    if !round_trip {
        println!("{} body does not survive a round trip", "error:".red().bold());
    }
    Ok(())
}

fn describe(kind: &AmbiguityKind) -> String {
    match kind {
        AmbiguityKind::InvalidAttributes => "invalid marker attributes".to_string(),
        AmbiguityKind::UnterminatedBlock { name } => format!("unterminated {name} block"),
        AmbiguityKind::StrayCloser { name } => format!("stray {name} closer"),
        AmbiguityKind::MismatchedCloser { expected, found } => {
            format!("{found} closer where {expected} was open")
        }
    }
}
