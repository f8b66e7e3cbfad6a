//! The batch runner: one pass of a migration over a document store

use std::fmt;

use press_blocks::{ApplyReport, Document, ParseAmbiguity, RuleSet};
use press_store::{
    AssetFetcher, DocumentStore, LocalMirrorFetcher, RetryingFetcher, RunLog, Severity,
};
use serde::{Deserialize, Serialize};

use crate::config::MigrationConfig;
use crate::rules::{RuleRegistry, compile_rules};
use crate::{Error, Partition, ResourceCeiling, Result, diff, media};

/// Log category for records about the run as a whole.
pub const RUN_CATEGORY: &str = "run";

/// Outcome of migrating one body in memory.
#[derive(Debug, Clone)]
pub struct MigrationResult {
    /// Serialized document after all rules ran
    pub body: String,
    pub changed: bool,
    pub report: ApplyReport,
    pub ambiguities: Vec<ParseAmbiguity>,
    /// Remote media referenced after the rules ran but not before
    pub new_media: Vec<String>,
}

/// Parse, verify, apply `rules` and serialize one body.
///
/// # Errors
///
/// Returns `RoundTripMismatch` if the body does not survive an untouched
/// parse/serialize cycle, or the first error a rule reports.
pub fn migrate_body(body: &str, rules: &RuleSet) -> press_blocks::Result<MigrationResult> {
    let mut doc = Document::parse_verified(body)?;
    let media_before = media::media_urls(&doc);

    let report = rules.apply(&mut doc)?;
    let output = doc.serialize();
    let changed = output != body;
    let new_media = if changed {
        media::media_urls(&doc)
            .difference(&media_before)
            .cloned()
            .collect()
    } else {
        Vec::new()
    };

    Ok(MigrationResult {
        changed,
        report,
        ambiguities: doc.ambiguities().to_vec(),
        new_media,
        body: output,
    })
}

/// What happened to one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    /// The skip flag was already set
    Skipped,
    /// No rule changed the body
    Unchanged,
    /// Dry run: the body would be rewritten
    WouldChange { edits: usize, diff: String },
    /// The rewritten body was stored
    Changed { edits: usize },
    /// Reading, rewriting or writing failed; the document was left as is
    Failed { reason: String },
}

impl DocumentOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Unchanged => "unchanged",
            Self::WouldChange { .. } => "would change",
            Self::Changed { .. } => "changed",
            Self::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
    pub id: String,
    pub outcome: DocumentOutcome,
    /// Rules that made at least one edit
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<String>,
    #[serde(default)]
    pub ambiguities: usize,
}

impl DocumentReport {
    fn new(id: &str, outcome: DocumentOutcome) -> Self {
        Self {
            id: id.to_string(),
            outcome,
            rules: Vec::new(),
            ambiguities: 0,
        }
    }
}

/// Counts and per-document outcomes for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub name: String,
    pub dry_run: bool,
    /// Documents in this worker's partition
    pub considered: usize,
    pub skipped: usize,
    pub unchanged: usize,
    pub changed: usize,
    pub would_change: usize,
    pub failed: usize,
    pub documents: Vec<DocumentReport>,
}

impl RunSummary {
    fn new(name: &str, dry_run: bool) -> Self {
        Self {
            name: name.to_string(),
            dry_run,
            ..Self::default()
        }
    }

    fn record(&mut self, report: DocumentReport) {
        match report.outcome {
            DocumentOutcome::Skipped => self.skipped += 1,
            DocumentOutcome::Unchanged => self.unchanged += 1,
            DocumentOutcome::WouldChange { .. } => self.would_change += 1,
            DocumentOutcome::Changed { .. } => self.changed += 1,
            DocumentOutcome::Failed { .. } => self.failed += 1,
        }
        self.documents.push(report);
    }

    /// Documents the run actually read and rewrote (or tried to).
    pub fn processed(&self) -> usize {
        self.unchanged + self.changed + self.would_change + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn document(&self, id: &str) -> Option<&DocumentReport> {
        self.documents.iter().find(|d| d.id == id)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} considered, {} {}, {} unchanged, {} skipped, {} failed",
            self.name,
            self.considered,
            if self.dry_run { self.would_change } else { self.changed },
            if self.dry_run { "would change" } else { "changed" },
            self.unchanged,
            self.skipped,
            self.failed
        )
    }
}

/// Runs a rule set over every document of a store that this worker owns.
///
/// Documents are processed one at a time. Store, rule and fetch failures
/// fail only the current document; a round-trip mismatch or a breached
/// resource ceiling stops the run.
pub struct Runner {
    name: String,
    rules: RuleSet,
    skip_flag: String,
    dry_run: bool,
    partition: Partition,
    ceiling: ResourceCeiling,
    fetcher: Option<Box<dyn AssetFetcher>>,
}

impl Runner {
    pub fn new(name: impl Into<String>, rules: RuleSet) -> Self {
        let name = name.into();
        Self {
            skip_flag: name.clone(),
            name,
            rules,
            dry_run: false,
            partition: Partition::default(),
            ceiling: ResourceCeiling::default(),
            fetcher: None,
        }
    }

    /// Build a runner from a loaded config, compiling its rules.
    pub fn from_config(config: &MigrationConfig, registry: &RuleRegistry) -> Result<Self> {
        let rules = compile_rules(&config.rules, registry)?;
        let mut runner = Self::new(&config.name, rules)
            .with_skip_flag(config.skip_flag())
            .dry_run(config.dry_run)
            .with_partition(config.partition)
            .with_ceiling(config.ceiling);

        if let Some(mirror) = &config.fetch.mirror {
            runner = runner.with_fetcher(RetryingFetcher::new(
                LocalMirrorFetcher::new(mirror),
                config.fetch.retry,
            ));
        }
        Ok(runner)
    }

    pub fn with_skip_flag(mut self, flag: impl Into<String>) -> Self {
        self.skip_flag = flag.into();
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_partition(mut self, partition: Partition) -> Self {
        self.partition = partition;
        self
    }

    pub fn with_ceiling(mut self, ceiling: ResourceCeiling) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn with_fetcher(mut self, fetcher: impl AssetFetcher + 'static) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Process every owned document.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot list documents, the run log cannot be
    /// written, the resource ceiling is breached or a document fails its
    /// round-trip check. Per-document failures are reported in the summary
    /// instead.
    pub fn run(&self, store: &mut dyn DocumentStore, log: &mut dyn RunLog) -> Result<RunSummary> {
        let ids: Vec<String> = store
            .ids()?
            .into_iter()
            .filter(|id| self.partition.owns(id))
            .collect();

        let mut summary = RunSummary::new(&self.name, self.dry_run);
        summary.considered = ids.len();
        log.info(
            RUN_CATEGORY,
            &format!(
                "starting {} over {} documents (partition {}, {} rules{})",
                self.name,
                ids.len(),
                self.partition,
                self.rules.len(),
                if self.dry_run { ", dry run" } else { "" }
            ),
        )?;

        for id in &ids {
            if let Err(e) = self.ceiling.check(summary.processed()) {
                log.error(RUN_CATEGORY, &format!("aborting: {e}"))?;
                return Err(e);
            }

            let span = tracing::info_span!("document", id = %id);
            let _guard = span.enter();
            let report = self.process(id, store, log)?;
            tracing::debug!(outcome = report.outcome.label(), "processed document");
            summary.record(report);
        }

        log.info(RUN_CATEGORY, &summary.to_string())?;
        tracing::info!(%summary, "run finished");
        Ok(summary)
    }

    fn process(
        &self,
        id: &str,
        store: &mut dyn DocumentStore,
        log: &mut dyn RunLog,
    ) -> Result<DocumentReport> {
        match store.has_flag(id, &self.skip_flag) {
            Ok(true) => {
                log.record(id, "skipped: already migrated", Severity::Debug)?;
                return Ok(DocumentReport::new(id, DocumentOutcome::Skipped));
            }
            Ok(false) => {}
            Err(e) => return self.fail(id, log, format!("could not read skip flag: {e}")),
        }

        let body = match store.get_body(id) {
            Ok(body) => body,
            Err(e) => return self.fail(id, log, format!("could not read body: {e}")),
        };

        let result = match migrate_body(&body, &self.rules) {
            Ok(result) => result,
            Err(source @ press_blocks::Error::RoundTripMismatch { .. }) => {
                log.error(id, &format!("round-trip check failed: {source}"))?;
                return Err(Error::RoundTrip {
                    id: id.to_string(),
                    source,
                });
            }
            Err(e) => return self.fail(id, log, format!("rule failed: {e}")),
        };

        for ambiguity in &result.ambiguities {
            log.warning(
                id,
                &format!(
                    "kept malformed marker as text at byte {}: {:?}",
                    ambiguity.offset, ambiguity.kind
                ),
            )?;
        }

        let mut report = DocumentReport::new(id, DocumentOutcome::Unchanged);
        report.ambiguities = result.ambiguities.len();
        report.rules = result
            .report
            .applied_rules()
            .into_iter()
            .map(String::from)
            .collect();

        if !result.changed {
            log.record(id, "unchanged", Severity::Debug)?;
            if !self.dry_run {
                self.mark_processed(id, store, log)?;
            }
            return Ok(report);
        }

        if let Some(fetcher) = &self.fetcher {
            for url in &result.new_media {
                if let Err(e) = fetcher.fetch(url) {
                    return self.fail(id, log, format!("media not retrievable: {e}"));
                }
            }
        }

        let edits = result.report.total_edits();
        if self.dry_run {
            let preview = diff::unified_diff(id, &body, &result.body);
            let lines = diff::line_changes(&body, &result.body);
            log.info(
                id,
                &format!(
                    "would change: {edits} edits, +{} -{} lines ({})",
                    lines.added,
                    lines.removed,
                    report.rules.join(", ")
                ),
            )?;
            report.outcome = DocumentOutcome::WouldChange {
                edits,
                diff: preview,
            };
            return Ok(report);
        }

        if let Err(e) = store.set_body(id, &result.body) {
            return self.fail(id, log, format!("could not write body: {e}"));
        }
        log.info(
            id,
            &format!("changed: {edits} edits ({})", report.rules.join(", ")),
        )?;
        self.mark_processed(id, store, log)?;
        report.outcome = DocumentOutcome::Changed { edits };
        Ok(report)
    }

    /// Set the skip flag. A failure only costs a redundant pass next run.
    fn mark_processed(
        &self,
        id: &str,
        store: &mut dyn DocumentStore,
        log: &mut dyn RunLog,
    ) -> Result<()> {
        if let Err(e) = store.set_flag(id, &self.skip_flag) {
            log.warning(id, &format!("could not set skip flag: {e}"))?;
        }
        Ok(())
    }

    fn fail(&self, id: &str, log: &mut dyn RunLog, reason: String) -> Result<DocumentReport> {
        log.warning(id, &reason)?;
        Ok(DocumentReport::new(id, DocumentOutcome::Failed { reason }))
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("name", &self.name)
            .field("rules", &self.rules)
            .field("skip_flag", &self.skip_flag)
            .field("dry_run", &self.dry_run)
            .field("partition", &self.partition)
            .field("ceiling", &self.ceiling)
            .field("fetcher", &self.fetcher.is_some())
            .finish()
    }
}
