//! Rule application over parsed documents.
//!
//! A [`Rule`] mutates one [`Document`] through its block-level operations and
//! reports how many edits it made. Rules must be idempotent: once applied,
//! their predicate no longer matches, so a second pass makes no edits.

use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::document::Document;
use crate::edit::EditStatus;
use crate::error::{Error, Result};
use crate::matcher::BlockMatcher;

/// A named transformation of a document.
pub trait Rule: Send + Sync {
    /// Rule identifier used in reports and logs
    fn name(&self) -> &str;

    /// Apply the rule, returning the number of edits made.
    fn apply(&self, doc: &mut Document) -> Result<usize>;
}

/// Edits made by one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub rule: String,
    pub edits: usize,
}

/// Result of applying a [`RuleSet`] to one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub outcomes: Vec<RuleOutcome>,
}

impl ApplyReport {
    pub fn total_edits(&self) -> usize {
        self.outcomes.iter().map(|o| o.edits).sum()
    }

    /// Names of the rules that made at least one edit.
    pub fn applied_rules(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.edits > 0)
            .map(|o| o.rule.as_str())
            .collect()
    }
}

/// An ordered sequence of rules.
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule (builder style).
    pub fn with(mut self, rule: impl Rule + 'static) -> Self {
        self.push(rule);
        self
    }

    pub fn push(&mut self, rule: impl Rule + 'static) {
        self.rules.push(Box::new(rule));
    }

    pub fn push_boxed(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Apply every rule in order.
    ///
    /// # Errors
    ///
    /// Stops at the first rule that fails. The document keeps the edits made
    /// so far; callers discard it rather than persisting a partial result.
    pub fn apply(&self, doc: &mut Document) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();
        for rule in &self.rules {
            let edits = rule.apply(doc)?;
            tracing::debug!(rule = rule.name(), edits, "applied rule");
            report.outcomes.push(RuleOutcome {
                rule: rule.name().to_string(),
                edits,
            });
        }
        Ok(report)
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSet")
            .field("rules", &self.names())
            .finish()
    }
}

fn count(status: EditStatus) -> usize {
    usize::from(status.is_applied())
}

/// Delete every block matching the matcher.
#[derive(Debug, Clone)]
pub struct DeleteMatching {
    pub name: String,
    pub matcher: BlockMatcher,
}

impl DeleteMatching {
    pub fn new(name: impl Into<String>, matcher: BlockMatcher) -> Self {
        Self {
            name: name.into(),
            matcher,
        }
    }
}

impl Rule for DeleteMatching {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, doc: &mut Document) -> Result<usize> {
        let mut edits = 0;
        let mut from = 0;
        while let Some(index) = doc.find_first_from(from, self.matcher.predicate()) {
            edits += count(doc.delete(index));
            from = index;
        }
        Ok(edits)
    }
}

/// Remove the first matching block and everything after it.
#[derive(Debug, Clone)]
pub struct TruncateFrom {
    pub name: String,
    pub matcher: BlockMatcher,
}

impl TruncateFrom {
    pub fn new(name: impl Into<String>, matcher: BlockMatcher) -> Self {
        Self {
            name: name.into(),
            matcher,
        }
    }
}

impl Rule for TruncateFrom {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, doc: &mut Document) -> Result<usize> {
        Ok(doc
            .find_first(self.matcher.predicate())
            .map_or(0, |index| count(doc.truncate_from(index))))
    }
}

type InnerTransform = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// Rewrite the inner markup of every matching block.
pub struct RewriteMatching {
    pub name: String,
    pub matcher: BlockMatcher,
    transform: InnerTransform,
}

impl RewriteMatching {
    pub fn new<F>(name: impl Into<String>, matcher: BlockMatcher, transform: F) -> Self
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            matcher,
            transform: Box::new(transform),
        }
    }
}

impl Rule for RewriteMatching {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, doc: &mut Document) -> Result<usize> {
        let mut edits = 0;
        for index in doc.find_all(self.matcher.predicate()) {
            let Some(block) = doc.block(index) else {
                continue;
            };
            let rewritten = (self.transform)(&block.inner_markup)?;
            edits += count(doc.rewrite_inner(index, |_| rewritten));
        }
        Ok(edits)
    }
}

type BlockBuilder = Box<dyn Fn(&Block) -> Block + Send + Sync>;

/// Replace every matching block with one built from it.
///
/// The built block must not match the matcher again, or the rule would keep
/// replacing its own output. Applying fails with
/// [`Error::SelfMatchingReplacement`] when it does.
pub struct ReplaceMatching {
    pub name: String,
    pub matcher: BlockMatcher,
    build: BlockBuilder,
}

impl ReplaceMatching {
    pub fn new<F>(name: impl Into<String>, matcher: BlockMatcher, build: F) -> Self
    where
        F: Fn(&Block) -> Block + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            matcher,
            build: Box::new(build),
        }
    }
}

impl Rule for ReplaceMatching {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, doc: &mut Document) -> Result<usize> {
        let mut edits = 0;
        for index in doc.find_all(self.matcher.predicate()) {
            let Some(block) = doc.block(index) else {
                continue;
            };
            let replacement = (self.build)(block);
            if self.matcher.matches(&replacement) {
                return Err(Error::SelfMatchingReplacement {
                    rule: self.name.clone(),
                });
            }
            edits += count(doc.replace(index, replacement));
        }
        Ok(edits)
    }
}

/// Where an inserted block goes relative to its anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Before,
    #[default]
    After,
}

/// Insert a block next to the first anchor match, unless a guard block
/// already exists anywhere in the document.
pub struct InsertRelative {
    pub name: String,
    pub anchor: BlockMatcher,
    /// Skip the document if any block matches; keeps the rule idempotent
    pub unless: BlockMatcher,
    pub placement: Placement,
    build: BlockBuilder,
}

impl InsertRelative {
    pub fn new<F>(
        name: impl Into<String>,
        anchor: BlockMatcher,
        unless: BlockMatcher,
        placement: Placement,
        build: F,
    ) -> Self
    where
        F: Fn(&Block) -> Block + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            anchor,
            unless,
            placement,
            build: Box::new(build),
        }
    }
}

impl Rule for InsertRelative {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, doc: &mut Document) -> Result<usize> {
        if doc.find_first(self.unless.predicate()).is_some() {
            return Ok(0);
        }
        let Some(index) = doc.find_first(self.anchor.predicate()) else {
            return Ok(0);
        };
        let Some(anchor) = doc.block(index) else {
            return Ok(0);
        };
        let block = (self.build)(anchor);
        let at = match self.placement {
            Placement::Before => index,
            Placement::After => index + 1,
        };
        Ok(count(doc.insert(at, block)))
    }
}

type DocumentFn = Box<dyn Fn(&mut Document) -> Result<usize> + Send + Sync>;

/// A rule backed by a closure, for one-off publisher logic.
pub struct FnRule {
    name: String,
    apply: DocumentFn,
}

impl FnRule {
    pub fn new<F>(name: impl Into<String>, apply: F) -> Self
    where
        F: Fn(&mut Document) -> Result<usize> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            apply: Box::new(apply),
        }
    }
}

impl Rule for FnRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, doc: &mut Document) -> Result<usize> {
        (self.apply)(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn body() -> &'static str {
        "<!-- wp:paragraph --><p>a</p><!-- /wp:paragraph -->\n\n\
         <!-- wp:html --><div>donate</div><!-- /wp:html -->\n\n\
         <!-- wp:paragraph --><p>b</p><!-- /wp:paragraph -->\n\n\
         <!-- wp:html --><div>donate again</div><!-- /wp:html -->\n"
    }

    #[test]
    fn delete_matching_removes_every_match() {
        let mut doc = Document::parse(body());
        let rule = DeleteMatching::new("donations", BlockMatcher::kind("html").inner_contains("donate"));
        assert_eq!(rule.apply(&mut doc).unwrap(), 2);
        assert_eq!(doc.len(), 2);
        assert_eq!(rule.apply(&mut doc).unwrap(), 0);
    }

    #[test]
    fn truncate_from_first_match() {
        let mut doc = Document::parse(body());
        let rule = TruncateFrom::new("strip-tail", BlockMatcher::kind("html"));
        assert_eq!(rule.apply(&mut doc).unwrap(), 1);
        assert_eq!(doc.len(), 1);
        assert_eq!(
            doc.serialize(),
            "<!-- wp:paragraph --><p>a</p><!-- /wp:paragraph -->\n"
        );
    }

    #[test]
    fn rule_set_reports_per_rule() {
        let rules = RuleSet::new()
            .with(DeleteMatching::new("donations", BlockMatcher::kind("html")))
            .with(FnRule::new("noop", |_| Ok(0)));
        let mut doc = Document::parse(body());
        let report = rules.apply(&mut doc).unwrap();
        assert_eq!(report.total_edits(), 2);
        assert_eq!(report.applied_rules(), vec!["donations"]);
        assert_eq!(rules.names(), vec!["donations", "noop"]);
    }

    #[test]
    fn insert_relative_respects_guard() {
        let rule = InsertRelative::new(
            "separator-after-first-paragraph",
            BlockMatcher::kind("paragraph"),
            BlockMatcher::kind("separator"),
            Placement::After,
            |_| Block::void("separator", Map::new()),
        );
        let mut doc = Document::parse(body());
        assert_eq!(rule.apply(&mut doc).unwrap(), 1);
        assert!(doc.block(1).unwrap().is("separator"));
        assert_eq!(rule.apply(&mut doc).unwrap(), 0);
    }
}
