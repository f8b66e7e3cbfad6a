//! Block serialization.
//!
//! Untouched blocks are written back with the marker text captured by the
//! parser. Blocks whose name, attributes or void flag changed get fresh
//! markers with compact, insertion-ordered attribute JSON.

use serde_json::{Map, Value};

use crate::block::{Block, DEFAULT_NAMESPACE};
use crate::document::Document;

/// Serializes a document back to its textual body.
pub fn serialize(doc: &Document) -> String {
    let mut out = String::with_capacity(doc.original().len());
    for block in doc.blocks() {
        out.push_str(&block.separator);
        write_block(&mut out, block);
    }
    out.push_str(doc.trailer());
    out
}

pub(crate) fn write_block(out: &mut String, block: &Block) {
    let Some(name) = block.name.as_deref() else {
        out.push_str(&block.inner_markup);
        return;
    };

    if let Some(raw) = block.raw.as_ref().filter(|raw| raw.describes(block)) {
        out.push_str(&raw.open);
        if !block.void {
            out.push_str(&block.inner_markup);
            out.push_str(&raw.close);
        }
        return;
    }

    out.push_str(&opening_marker(name, &block.attributes, block.void));
    if !block.void {
        out.push_str(&block.inner_markup);
        out.push_str(&closing_marker(name));
    }
}

/// Name as written in a marker: the default namespace is left implicit.
fn marker_name(name: &str) -> &str {
    name.strip_prefix(DEFAULT_NAMESPACE)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(name)
}

/// Creates the opening (or self-closing) marker for a block.
pub fn opening_marker(name: &str, attributes: &Map<String, Value>, void: bool) -> String {
    let mut marker = format!("<!-- wp:{} ", marker_name(name));
    if !attributes.is_empty() {
        marker.push_str(&serialize_attributes(attributes));
        marker.push(' ');
    }
    marker.push_str(if void { "/-->" } else { "-->" });
    marker
}

/// Creates the closing marker for a block.
pub fn closing_marker(name: &str) -> String {
    format!("<!-- /wp:{} -->", marker_name(name))
}

/// Compact attribute JSON, safe to embed in an HTML comment.
///
/// Keys keep their insertion order. Sequences that could end the comment or
/// be read as markup are written as JSON unicode escapes.
pub fn serialize_attributes(attributes: &Map<String, Value>) -> String {
    let json = Value::Object(attributes.clone()).to_string();
    escape_quotes_in_strings(&json)
        .replace("--", "\\u002d\\u002d")
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

/// Rewrite escaped quotes inside JSON strings (`\"`) as `\u0022`.
fn escape_quotes_in_strings(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in json.chars() {
        if escaped {
            escaped = false;
            if c == '"' {
                out.pop();
                out.push_str("\\u0022");
            } else {
                out.push(c);
            }
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            _ => {}
        }
        out.push(c);
    }

    out
}
