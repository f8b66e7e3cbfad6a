//! Rule entries as written in migration configs
//!
//! ```toml
//! [[rules]]
//! action = "delete"
//! name = "remove-donation-embeds"
//! match = { kind = "html", inner_contains = "donorbox.org" }
//!
//! [[rules]]
//! action = "strip_element"
//! name = "strip-tracking-pixels"
//! match = { kind = "paragraph" }
//! tag = "img"
//! containing = "pixel.gif"
//! ```

use std::collections::BTreeSet;
use std::sync::LazyLock;

use press_blocks::markup;
use press_blocks::{
    Block, BlockMatcher, DeleteMatching, FnRule, InsertRelative, Placement, ReplaceMatching,
    RewriteMatching, Rule, RuleSet, TruncateFrom,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::RuleRegistry;
use crate::{Error, Result};

static KIND_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z][a-z0-9_-]*/)?[a-z][a-z0-9_-]*$").expect("Invalid block kind regex")
});

static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]*$").expect("Invalid tag name regex"));

/// Replaced by the inner markup of the block being replaced.
pub const INNER_PLACEHOLDER: &str = "{inner}";

/// A block to build when a rule replaces or inserts one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockTemplate {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    /// May contain `{inner}` when replacing
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub inner_markup: String,
    #[serde(default)]
    pub void: bool,
    /// Start from the replaced block's attributes, then apply `attributes`
    #[serde(default)]
    pub keep_attributes: bool,
}

impl BlockTemplate {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: Map::new(),
            inner_markup: String::new(),
            void: false,
            keep_attributes: false,
        }
    }

    /// Build the block, optionally from the block it replaces.
    pub fn build(&self, source: Option<&Block>) -> Block {
        let mut attributes = match source {
            Some(block) if self.keep_attributes => block.attributes.clone(),
            _ => Map::new(),
        };
        for (key, value) in &self.attributes {
            attributes.insert(key.clone(), value.clone());
        }

        if self.void {
            return Block::void(&self.kind, attributes);
        }
        let inner = match source {
            Some(block) => self
                .inner_markup
                .replace(INNER_PLACEHOLDER, &block.inner_markup),
            None => self.inner_markup.clone(),
        };
        Block::new(&self.kind, attributes, inner)
    }

    /// Matches blocks this template builds, ignoring inner markup.
    pub fn guard(&self) -> BlockMatcher {
        BlockMatcher {
            kind: Some(self.kind.clone()),
            attributes: self.attributes.clone(),
            ..BlockMatcher::default()
        }
    }

    /// Whether a block this template builds from a block matching `matcher`
    /// could match `matcher` again.
    ///
    /// Conditions copied from the source carry over: kept attributes keep
    /// their values and `{inner}` keeps the source's inner markup. The only
    /// inner condition ruled out in that case is an `inner_excludes` needle
    /// written into the template itself.
    pub fn may_rematch(&self, matcher: &BlockMatcher) -> bool {
        let sample = self.build(None);
        if let Some(kind) = &matcher.kind
            && !sample.is(kind)
        {
            return false;
        }
        for (key, value) in &matcher.attributes {
            match self.attributes.get(key) {
                Some(set) if set != value => return false,
                None if !self.keep_attributes => return false,
                _ => {}
            }
        }
        if matcher
            .has_attributes
            .iter()
            .any(|key| !self.keep_attributes && !self.attributes.contains_key(key))
        {
            return false;
        }

        if self.void || !self.inner_markup.contains(INNER_PLACEHOLDER) {
            let inner = BlockMatcher {
                inner_contains: matcher.inner_contains.clone(),
                inner_excludes: matcher.inner_excludes.clone(),
                inner_pattern: matcher.inner_pattern.clone(),
                text_contains: matcher.text_contains.clone(),
                ..BlockMatcher::default()
            };
            return inner.matches(&sample);
        }
        if let Some(needle) = &matcher.inner_excludes
            && self
                .inner_markup
                .split(INNER_PLACEHOLDER)
                .any(|part| part.contains(needle.as_str()))
        {
            return false;
        }
        true
    }

    fn validate(&self, rule: &str) -> Result<()> {
        if !KIND_REGEX.is_match(&self.kind) {
            return Err(Error::invalid_rule(
                rule,
                format!("'{}' is not a valid block kind", self.kind),
            ));
        }
        if self.void && !self.inner_markup.is_empty() {
            return Err(Error::invalid_rule(
                rule,
                "a void block cannot have inner markup",
            ));
        }
        Ok(())
    }
}

/// One `[[rules]]` entry, tagged by its `action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RuleSpec {
    /// Delete every matching block
    Delete {
        name: String,
        #[serde(rename = "match")]
        matcher: BlockMatcher,
    },

    /// Remove the first matching block and everything after it
    TruncateFrom {
        name: String,
        #[serde(rename = "match")]
        matcher: BlockMatcher,
    },

    /// Remove `<tag>` elements whose opening tag contains `containing` from
    /// the inner markup of matching blocks
    StripElement {
        name: String,
        #[serde(rename = "match")]
        matcher: BlockMatcher,
        tag: String,
        containing: String,
    },

    /// Remove a literal substring from the inner markup of matching blocks
    RemoveText {
        name: String,
        #[serde(rename = "match")]
        matcher: BlockMatcher,
        text: String,
    },

    /// Set one attribute on every matching block
    SetAttribute {
        name: String,
        #[serde(rename = "match")]
        matcher: BlockMatcher,
        key: String,
        value: Value,
    },

    /// Replace every matching block with a block built from a template
    ReplaceWith {
        name: String,
        #[serde(rename = "match")]
        matcher: BlockMatcher,
        block: BlockTemplate,
    },

    /// Insert a block after the first match, unless the document already
    /// holds one like it
    InsertAfter {
        name: String,
        #[serde(rename = "match")]
        matcher: BlockMatcher,
        block: BlockTemplate,
    },

    /// Insert a block before the first match, unless the document already
    /// holds one like it
    InsertBefore {
        name: String,
        #[serde(rename = "match")]
        matcher: BlockMatcher,
        block: BlockTemplate,
    },

    /// A rule registered in code under `name`
    Custom { name: String },
}

impl RuleSpec {
    pub fn name(&self) -> &str {
        match self {
            Self::Delete { name, .. }
            | Self::TruncateFrom { name, .. }
            | Self::StripElement { name, .. }
            | Self::RemoveText { name, .. }
            | Self::SetAttribute { name, .. }
            | Self::ReplaceWith { name, .. }
            | Self::InsertAfter { name, .. }
            | Self::InsertBefore { name, .. }
            | Self::Custom { name } => name,
        }
    }

    /// The action keyword as written in configs.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Delete { .. } => "delete",
            Self::TruncateFrom { .. } => "truncate_from",
            Self::StripElement { .. } => "strip_element",
            Self::RemoveText { .. } => "remove_text",
            Self::SetAttribute { .. } => "set_attribute",
            Self::ReplaceWith { .. } => "replace_with",
            Self::InsertAfter { .. } => "insert_after",
            Self::InsertBefore { .. } => "insert_before",
            Self::Custom { .. } => "custom",
        }
    }

    /// Compile into an executable rule.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRule` for entries that could never run safely: an
    /// empty match on a destructive action, a replacement that matches its
    /// own rule, or a custom name with no registration.
    pub fn compile(&self, registry: &RuleRegistry) -> Result<Box<dyn Rule>> {
        let name = self.name().to_string();
        let rule: Box<dyn Rule> = match self {
            Self::Delete { matcher, .. } => {
                require_conditions(&name, matcher)?;
                Box::new(DeleteMatching::new(name, matcher.clone()))
            }
            Self::TruncateFrom { matcher, .. } => {
                require_conditions(&name, matcher)?;
                Box::new(TruncateFrom::new(name, matcher.clone()))
            }
            Self::StripElement {
                matcher,
                tag,
                containing,
                ..
            } => {
                if !TAG_REGEX.is_match(tag) {
                    return Err(Error::invalid_rule(
                        &name,
                        format!("'{tag}' is not a valid tag name"),
                    ));
                }
                let (tag, containing) = (tag.clone(), containing.clone());
                Box::new(RewriteMatching::new(name, matcher.clone(), move |inner| {
                    markup::remove_elements(inner, &tag, &containing)
                }))
            }
            Self::RemoveText { matcher, text, .. } => {
                if text.is_empty() {
                    return Err(Error::invalid_rule(&name, "text must not be empty"));
                }
                let text = text.clone();
                Box::new(RewriteMatching::new(name, matcher.clone(), move |inner| {
                    Ok(markup::remove_text(inner, &text))
                }))
            }
            Self::SetAttribute {
                matcher,
                key,
                value,
                ..
            } => {
                if key.is_empty() {
                    return Err(Error::invalid_rule(&name, "key must not be empty"));
                }
                Box::new(set_attribute_rule(name, matcher.clone(), key.clone(), value.clone()))
            }
            Self::ReplaceWith { matcher, block, .. } => {
                require_conditions(&name, matcher)?;
                block.validate(&name)?;
                if block.may_rematch(matcher) {
                    return Err(Error::invalid_rule(
                        &name,
                        "the replacement block could match the rule's own match table",
                    ));
                }
                let template = block.clone();
                Box::new(ReplaceMatching::new(name, matcher.clone(), move |old| {
                    template.build(Some(old))
                }))
            }
            Self::InsertAfter { matcher, block, .. } | Self::InsertBefore { matcher, block, .. } => {
                require_conditions(&name, matcher)?;
                block.validate(&name)?;
                let placement = if matches!(self, Self::InsertBefore { .. }) {
                    Placement::Before
                } else {
                    Placement::After
                };
                let template = block.clone();
                Box::new(InsertRelative::new(
                    name,
                    matcher.clone(),
                    block.guard(),
                    placement,
                    move |_| template.build(None),
                ))
            }
            Self::Custom { .. } => registry.build(&name).ok_or_else(|| {
                Error::invalid_rule(&name, "no rule is registered under this name")
            })?,
        };
        Ok(rule)
    }
}

fn require_conditions(name: &str, matcher: &BlockMatcher) -> Result<()> {
    if *matcher == BlockMatcher::default() {
        return Err(Error::invalid_rule(
            name,
            "match must set at least one condition",
        ));
    }
    Ok(())
}

fn set_attribute_rule(name: String, matcher: BlockMatcher, key: String, value: Value) -> FnRule {
    FnRule::new(name, move |doc| {
        let mut edits = 0;
        for index in doc.find_all(matcher.predicate()) {
            let Some(block) = doc.block(index) else {
                continue;
            };
            if block.is_freeform() || block.attribute(&key) == Some(&value) {
                continue;
            }
            let mut updated = block.clone();
            updated.set_attribute(key.clone(), value.clone());
            edits += usize::from(doc.replace(index, updated).is_applied());
        }
        Ok(edits)
    })
}

/// Compile a list of entries into a rule set, in order.
///
/// Rule names must be non-empty and unique; they key skip decisions and
/// run-log records.
pub fn compile_rules(specs: &[RuleSpec], registry: &RuleRegistry) -> Result<RuleSet> {
    let mut seen = BTreeSet::new();
    let mut rules = RuleSet::new();

    for spec in specs {
        let name = spec.name();
        if name.trim().is_empty() {
            return Err(Error::invalid_rule(
                name,
                format!("{} rule has an empty name", spec.action()),
            ));
        }
        if !seen.insert(name) {
            return Err(Error::invalid_rule(name, "duplicate rule name"));
        }
        rules.push_boxed(spec.compile(registry)?);
    }

    tracing::debug!(rules = ?rules.names(), "compiled rule set");
    Ok(rules)
}
