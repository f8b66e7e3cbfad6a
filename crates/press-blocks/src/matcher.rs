//! Block predicates.
//!
//! Document search operations accept any `Fn(&Block) -> bool`.
//! [`BlockMatcher`] is the structural, deserializable form used by
//! declarative rules; [`BlockMatcher::predicate`] adapts it.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::block::Block;
use crate::markup;

/// A compiled regular expression that (de)serializes as its source text.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(pattern: &str) -> crate::Result<Self> {
        Ok(Self(Regex::new(pattern)?))
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.as_str()).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Regex::new(&source)
            .map(Pattern)
            .map_err(serde::de::Error::custom)
    }
}

/// Structural block predicate. Every condition that is set must hold.
///
/// An empty matcher matches every block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlockMatcher {
    /// Block kind, with or without the `core/` namespace; `"none"` for freeform
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Attributes that must be present with exactly these values
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    /// Attribute keys that must be present with any value
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub has_attributes: Vec<String>,
    /// Literal substring of the inner markup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_contains: Option<String>,
    /// Literal substring that must not occur in the inner markup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_excludes: Option<String>,
    /// Regex over the inner markup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_pattern: Option<Pattern>,
    /// Case-insensitive substring of the inner markup with tags stripped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_contains: Option<String>,
}

impl BlockMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match blocks of this kind.
    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_attribute_present(mut self, key: impl Into<String>) -> Self {
        self.has_attributes.push(key.into());
        self
    }

    pub fn inner_contains(mut self, needle: impl Into<String>) -> Self {
        self.inner_contains = Some(needle.into());
        self
    }

    pub fn inner_excludes(mut self, needle: impl Into<String>) -> Self {
        self.inner_excludes = Some(needle.into());
        self
    }

    pub fn inner_pattern(mut self, pattern: Pattern) -> Self {
        self.inner_pattern = Some(pattern);
        self
    }

    pub fn text_contains(mut self, needle: impl Into<String>) -> Self {
        self.text_contains = Some(needle.into());
        self
    }

    /// Borrow this matcher as a closure for the document search operations.
    pub fn predicate(&self) -> impl Fn(&Block) -> bool + '_ {
        move |block| self.matches(block)
    }

    pub fn matches(&self, block: &Block) -> bool {
        if let Some(kind) = &self.kind
            && !block.is(kind)
        {
            return false;
        }
        if self
            .attributes
            .iter()
            .any(|(key, value)| block.attribute(key) != Some(value))
        {
            return false;
        }
        if self
            .has_attributes
            .iter()
            .any(|key| block.attribute(key).is_none())
        {
            return false;
        }
        if let Some(needle) = &self.inner_contains
            && !block.inner_markup.contains(needle.as_str())
        {
            return false;
        }
        if let Some(needle) = &self.inner_excludes
            && block.inner_markup.contains(needle.as_str())
        {
            return false;
        }
        if let Some(pattern) = &self.inner_pattern
            && !pattern.is_match(&block.inner_markup)
        {
            return false;
        }
        if let Some(needle) = &self.text_contains {
            let text = markup::strip_tags(&block.inner_markup).to_lowercase();
            if !text.contains(&needle.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn embed(inner: &str) -> Block {
        let mut block = Block::new("html", Map::new(), inner);
        block.set_attribute("provider", "donorbox");
        block
    }

    #[test]
    fn empty_matcher_matches_everything() {
        assert!(BlockMatcher::new().matches(&Block::freeform("x")));
        assert!(BlockMatcher::new().matches(&embed("")));
    }

    #[test]
    fn kind_and_inner_contains() {
        let matcher = BlockMatcher::kind("html").inner_contains("donorbox.org");
        assert!(matcher.matches(&embed("<iframe src=\"https://donorbox.org/x\">")));
        assert!(!matcher.matches(&embed("<iframe src=\"https://example.org\">")));
        assert!(!matcher.matches(&Block::freeform("donorbox.org")));
    }

    #[test]
    fn attribute_conditions() {
        let block = embed("");
        assert!(
            BlockMatcher::new()
                .with_attribute("provider", "donorbox")
                .matches(&block)
        );
        assert!(
            !BlockMatcher::new()
                .with_attribute("provider", json!("youtube"))
                .matches(&block)
        );
        assert!(
            BlockMatcher::new()
                .with_attribute_present("provider")
                .matches(&block)
        );
        assert!(
            !BlockMatcher::new()
                .with_attribute_present("url")
                .matches(&block)
        );
    }

    #[test]
    fn text_contains_ignores_tags_and_case() {
        let heading = Block::new("heading", Map::new(), "<h2><strong>RELATED</strong> stories</h2>");
        assert!(BlockMatcher::kind("heading").text_contains("related stories").matches(&heading));
    }

    #[test]
    fn inner_excludes_and_pattern() {
        let matcher = BlockMatcher::new()
            .inner_pattern(Pattern::new(r"wp-image-\d+").unwrap())
            .inner_excludes("data-migrated");
        assert!(matcher.matches(&Block::freeform("<img class=\"wp-image-12\">")));
        assert!(!matcher.matches(&Block::freeform("<img class=\"wp-image-12\" data-migrated>")));
    }

    #[test]
    fn deserializes_from_toml_style_json() {
        let matcher: BlockMatcher = serde_json::from_value(json!({
            "kind": "core/html",
            "inner_pattern": "donate",
            "attributes": {"align": "wide"}
        }))
        .unwrap();
        assert_eq!(matcher.kind.as_deref(), Some("core/html"));
        assert_eq!(matcher.inner_pattern.as_ref().map(Pattern::as_str), Some("donate"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<BlockMatcher, _> = serde_json::from_value(json!({"knd": "html"}));
        assert!(result.is_err());
    }

    #[test]
    fn invalid_pattern_fails_to_deserialize() {
        let result: Result<BlockMatcher, _> =
            serde_json::from_value(json!({"inner_pattern": "("}));
        assert!(result.is_err());
    }
}
