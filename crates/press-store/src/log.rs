//! Run logs: append-only records of what a migration did to each document.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, io};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// One run log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// What the record is about, usually a document id or `run`
    pub category: String,
    pub message: String,
    pub severity: Severity,
}

/// Append-only sink for `(category, message, severity)` records.
pub trait RunLog {
    fn record(&mut self, category: &str, message: &str, severity: Severity) -> Result<()>;

    fn info(&mut self, category: &str, message: &str) -> Result<()> {
        self.record(category, message, Severity::Info)
    }

    fn warning(&mut self, category: &str, message: &str) -> Result<()> {
        self.record(category, message, Severity::Warning)
    }

    fn error(&mut self, category: &str, message: &str) -> Result<()> {
        self.record(category, message, Severity::Error)
    }
}

fn entry(run_id: Uuid, category: &str, message: &str, severity: Severity) -> LogEntry {
    let entry = LogEntry {
        run_id,
        timestamp: Utc::now(),
        category: category.to_string(),
        message: message.to_string(),
        severity,
    };
    mirror(&entry);
    entry
}

/// Forward a record to `tracing` at the matching level.
fn mirror(entry: &LogEntry) {
    let category = entry.category.as_str();
    let message = entry.message.as_str();
    match entry.severity {
        Severity::Debug => tracing::debug!(category, "{message}"),
        Severity::Info => tracing::info!(category, "{message}"),
        Severity::Warning => tracing::warn!(category, "{message}"),
        Severity::Error => tracing::error!(category, "{message}"),
    }
}

/// Keeps records in memory.
#[derive(Debug, Clone)]
pub struct MemoryLog {
    run_id: Uuid,
    entries: Vec<LogEntry>,
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLog {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            entries: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Records at `severity` or above.
    pub fn at_least(&self, severity: Severity) -> Vec<&LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.severity >= severity)
            .collect()
    }

    pub fn for_category(&self, category: &str) -> Vec<&LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.category == category)
            .collect()
    }
}

impl RunLog for MemoryLog {
    fn record(&mut self, category: &str, message: &str, severity: Severity) -> Result<()> {
        self.entries
            .push(entry(self.run_id, category, message, severity));
        Ok(())
    }
}

/// Appends one JSON object per line to a file.
#[derive(Debug, Clone)]
pub struct JsonLinesLog {
    path: PathBuf,
    run_id: Uuid,
}

impl JsonLinesLog {
    /// Log to `path` under a fresh run id. Existing content is kept.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_run_id(path, Uuid::new_v4())
    }

    pub fn with_run_id(path: impl Into<PathBuf>, run_id: Uuid) -> Self {
        Self {
            path: path.into(),
            run_id,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Read every record from a log file.
    pub fn read(path: &Path) -> Result<Vec<LogEntry>> {
        io::read_text(path)?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| Ok(serde_json::from_str(line)?))
            .collect()
    }
}

impl RunLog for JsonLinesLog {
    fn record(&mut self, category: &str, message: &str, severity: Severity) -> Result<()> {
        let entry = entry(self.run_id, category, message, severity);
        io::append_line(&self.path, &serde_json::to_string(&entry)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_by_urgency() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
        assert_eq!(Severity::Warning.to_string(), "warning");
    }

    #[test]
    fn memory_log_filters() {
        let mut log = MemoryLog::new();
        log.info("post-1", "unchanged").unwrap();
        log.warning("post-2", "stray closer at byte 12").unwrap();
        log.error("post-3", "write failed").unwrap();

        assert_eq!(log.entries().len(), 3);
        assert_eq!(log.at_least(Severity::Warning).len(), 2);
        assert_eq!(log.for_category("post-2")[0].severity, Severity::Warning);
        assert!(log.entries().iter().all(|e| e.run_id == log.run_id()));
    }
}
