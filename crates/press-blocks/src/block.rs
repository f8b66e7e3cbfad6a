//! Block type and attribute handling

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Kind reported by blocks that hold freeform (untyped) markup.
pub const FREEFORM_KIND: &str = "none";

/// Namespace implied by markers that omit one (`wp:paragraph`).
pub const DEFAULT_NAMESPACE: &str = "core";

/// Normalize a block kind to its fully qualified form.
///
/// `paragraph` becomes `core/paragraph`; names that already carry a
/// namespace and the freeform kind are returned unchanged.
pub fn normalize_kind(kind: &str) -> String {
    if kind == FREEFORM_KIND || kind.contains('/') {
        kind.to_string()
    } else {
        format!("{DEFAULT_NAMESPACE}/{kind}")
    }
}

/// Marker text captured by the parser for one block.
///
/// The markers are reused verbatim on serialization as long as the block's
/// name, attributes and void flag still equal the values they encode.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawMarkers {
    pub(crate) open: String,
    pub(crate) close: String,
    name: String,
    attributes: Map<String, Value>,
    void: bool,
}

impl RawMarkers {
    pub(crate) fn new(
        open: impl Into<String>,
        close: impl Into<String>,
        name: impl Into<String>,
        attributes: Map<String, Value>,
        void: bool,
    ) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
            name: name.into(),
            attributes,
            void,
        }
    }

    /// True while the block still encodes exactly what was parsed.
    pub(crate) fn describes(&self, block: &Block) -> bool {
        block.void == self.void
            && block.name.as_deref() == Some(self.name.as_str())
            && block.attributes == self.attributes
    }
}

/// An atomic structural unit of a document body.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Fully qualified block name, or `None` for freeform markup
    pub name: Option<String>,
    /// Block attributes, kept in first-write order
    pub attributes: Map<String, Value>,
    /// Literal markup owned by the block (nested blocks stay opaque)
    pub inner_markup: String,
    pub(crate) void: bool,
    /// Whitespace preceding the block in the body
    pub(crate) separator: String,
    pub(crate) raw: Option<RawMarkers>,
}

impl Block {
    /// Create a typed block with inner markup.
    pub fn new(kind: &str, attributes: Map<String, Value>, inner_markup: impl Into<String>) -> Self {
        Self {
            name: Some(normalize_kind(kind)),
            attributes,
            inner_markup: inner_markup.into(),
            void: false,
            separator: String::new(),
            raw: None,
        }
    }

    /// Create a self-closing block (`<!-- wp:kind /-->`).
    pub fn void(kind: &str, attributes: Map<String, Value>) -> Self {
        Self {
            void: true,
            ..Self::new(kind, attributes, String::new())
        }
    }

    /// Create a freeform block holding raw markup.
    pub fn freeform(markup: impl Into<String>) -> Self {
        Self {
            name: None,
            attributes: Map::new(),
            inner_markup: markup.into(),
            void: false,
            separator: String::new(),
            raw: None,
        }
    }

    /// Create a typed block from attribute JSON text.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAttributes` if the text is not a JSON object.
    pub fn with_attributes_json(
        kind: &str,
        attributes: &str,
        inner_markup: impl Into<String>,
    ) -> Result<Self> {
        match serde_json::from_str::<Value>(attributes)? {
            Value::Object(map) => Ok(Self::new(kind, map, inner_markup)),
            other => Err(Error::InvalidAttributes(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }

    /// The block kind, `"none"` for freeform markup.
    pub fn kind(&self) -> &str {
        self.name.as_deref().unwrap_or(FREEFORM_KIND)
    }

    /// Check the block kind, accepting names with or without the `core/` namespace.
    pub fn is(&self, kind: &str) -> bool {
        self.kind() == normalize_kind(kind)
    }

    pub fn is_freeform(&self) -> bool {
        self.name.is_none()
    }

    /// Whether the block is self-closing.
    pub fn is_void(&self) -> bool {
        self.void
    }

    /// Whitespace that precedes this block in the serialized body.
    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Set an attribute. Existing keys keep their position.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Remove an attribute, preserving the order of the remaining keys.
    pub fn remove_attribute(&mut self, key: &str) -> Option<Value> {
        self.attributes.shift_remove(key)
    }

    /// Replace the inner markup. A void block that receives markup stops
    /// being self-closing.
    pub fn set_inner_markup(&mut self, markup: impl Into<String>) {
        self.inner_markup = markup.into();
        if self.void && !self.inner_markup.is_empty() {
            self.void = false;
        }
    }

    /// Serialize this block on its own, without its separator.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        crate::serializer::write_block(&mut out, self);
        out
    }
}
