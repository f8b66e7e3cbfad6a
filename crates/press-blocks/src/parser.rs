//! Block parsing for stored page bodies.
//!
//! Parses comment-delimited blocks with the format:
//! ```text
//! <!-- wp:namespace/name {"json":"attributes"} -->
//! inner markup
//! <!-- /wp:namespace/name -->
//! ```
//! or the self-closing form `<!-- wp:name {"id":1} /-->`.
//!
//! Only top-level blocks are materialized. Nested blocks stay inside their
//! parent's inner markup as opaque text. Malformed markers never fail the
//! parse: they are kept as freeform markup and reported as
//! [`ParseAmbiguity`] values.

use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::block::{Block, RawMarkers, normalize_kind};
use crate::document::Document;

/// Regex for block markers: openers, closers and self-closing markers.
///
/// The attribute object ends at the first `}` followed by whitespace and the
/// end of the comment. It never spans a `-->`, so a search that finds no
/// terminator stops at the end of the enclosing comment.
static MARKER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)<!--\s+(?P<closer>/)?wp:(?P<name>(?:[a-z][a-z0-9_-]*/)?[a-z][a-z0-9_-]*)\s+(?P<attrs>\{(?:[^-]|-[^-]|-{2,}[^->])*?\}\s+)?(?P<void>/)?-->",
    )
    .expect("Invalid block marker regex")
});

/// Why part of a body could not be read as a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AmbiguityKind {
    /// Marker attributes are not a JSON object.
    InvalidAttributes,
    /// Opening marker with no matching closer.
    UnterminatedBlock { name: String },
    /// Closing marker with no opener.
    StrayCloser { name: String },
    /// Closing marker names a different block than its opener.
    MismatchedCloser { expected: String, found: String },
}

/// A marker the parser recovered from by treating it as freeform markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseAmbiguity {
    pub kind: AmbiguityKind,
    /// Byte offset of the marker in the body
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Opener,
    Closer,
    Void,
}

#[derive(Debug)]
struct Token<'a> {
    kind: TokenKind,
    name: String,
    attrs: Option<&'a str>,
    span: Range<usize>,
    /// Index of the closer that balances this opener
    closer: Option<usize>,
}

impl<'a> Token<'a> {
    fn from_captures(caps: &Captures<'a>) -> Self {
        // Group 0 always participates in a match.
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let name = caps.name("name").map_or("", |m| m.as_str());
        let kind = if caps.name("closer").is_some() {
            TokenKind::Closer
        } else if caps.name("void").is_some() {
            TokenKind::Void
        } else {
            TokenKind::Opener
        };

        Self {
            kind,
            name: normalize_kind(name),
            attrs: caps.name("attrs").map(|m| m.as_str().trim_end()),
            span: whole,
            closer: None,
        }
    }

    /// Parse the marker attributes. `None` means they are not a JSON object.
    fn attributes(&self) -> Option<Map<String, Value>> {
        match self.attrs {
            None => Some(Map::new()),
            Some(text) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(map)) => Some(map),
                _ => None,
            },
        }
    }
}

/// Every marker in the body, with each opener linked to the closer that
/// brings nesting depth back to where the opener started.
///
/// Closers pair with the innermost open opener regardless of name; a name
/// check happens when the pair becomes a block.
fn tokenize(body: &str) -> Vec<Token<'_>> {
    let mut tokens: Vec<Token<'_>> = MARKER_REGEX
        .captures_iter(body)
        .map(|caps| Token::from_captures(&caps))
        .collect();

    let mut open = Vec::new();
    for index in 0..tokens.len() {
        match tokens[index].kind {
            TokenKind::Opener => open.push(index),
            TokenKind::Closer => {
                if let Some(opener) = open.pop() {
                    tokens[opener].closer = Some(index);
                }
            }
            TokenKind::Void => {}
        }
    }
    tokens
}

/// Accumulates blocks while keeping every byte between them.
struct Builder<'a> {
    body: &'a str,
    blocks: Vec<Block>,
    ambiguities: Vec<ParseAmbiguity>,
    separator: String,
}

impl<'a> Builder<'a> {
    fn new(body: &'a str) -> Self {
        Self {
            body,
            blocks: Vec::new(),
            ambiguities: Vec::new(),
            separator: String::new(),
        }
    }

    /// Text between blocks: whitespace becomes a separator, anything else a
    /// freeform block.
    fn push_gap(&mut self, range: Range<usize>) {
        let text = &self.body[range];
        if text.is_empty() {
            return;
        }
        if text.chars().all(char::is_whitespace) {
            self.separator.push_str(text);
        } else {
            let mut block = Block::freeform(text);
            block.separator = std::mem::take(&mut self.separator);
            self.blocks.push(block);
        }
    }

    fn push_block(&mut self, mut block: Block) {
        block.separator = std::mem::take(&mut self.separator);
        self.blocks.push(block);
    }

    fn ambiguity(&mut self, kind: AmbiguityKind, offset: usize) {
        tracing::debug!(?kind, offset, "treating block marker as freeform markup");
        self.ambiguities.push(ParseAmbiguity { kind, offset });
    }

    fn finish(mut self) -> Document {
        let trailer = std::mem::take(&mut self.separator);
        Document::from_parts(self.blocks, trailer, self.body, self.ambiguities)
    }
}

/// Parses a document body into its top-level blocks.
///
/// Never fails: malformed markers stay in the output as freeform markup and
/// are listed in [`Document::ambiguities`].
///
/// # Example
/// ```
/// use press_blocks::parse;
///
/// let body = "<!-- wp:paragraph -->\n<p>Hello</p>\n<!-- /wp:paragraph -->";
/// let doc = parse(body);
/// assert_eq!(doc.len(), 1);
/// assert_eq!(doc.blocks()[0].kind(), "core/paragraph");
/// assert_eq!(doc.serialize(), body);
/// ```
pub fn parse(body: &str) -> Document {
    let tokens = tokenize(body);
    let mut builder = Builder::new(body);
    // Start of text not yet assigned to a block
    let mut cursor = 0;
    let mut index = 0;

    while let Some(token) = tokens.get(index) {
        let start = token.span.start;
        index += 1;
        match token.kind {
            TokenKind::Closer => {
                builder.ambiguity(
                    AmbiguityKind::StrayCloser {
                        name: token.name.clone(),
                    },
                    start,
                );
            }
            TokenKind::Void => {
                let Some(attributes) = token.attributes() else {
                    builder.ambiguity(AmbiguityKind::InvalidAttributes, start);
                    continue;
                };
                builder.push_gap(cursor..start);
                let open = &body[token.span.clone()];
                let mut block = Block::void(&token.name, attributes.clone());
                block.raw = Some(RawMarkers::new(open, "", &token.name, attributes, true));
                builder.push_block(block);
                cursor = token.span.end;
            }
            TokenKind::Opener => {
                let Some(attributes) = token.attributes() else {
                    builder.ambiguity(AmbiguityKind::InvalidAttributes, start);
                    continue;
                };
                let Some(closer_index) = token.closer else {
                    builder.ambiguity(
                        AmbiguityKind::UnterminatedBlock {
                            name: token.name.clone(),
                        },
                        start,
                    );
                    continue;
                };
                let closer = &tokens[closer_index];
                if closer.name != token.name {
                    builder.ambiguity(
                        AmbiguityKind::MismatchedCloser {
                            expected: token.name.clone(),
                            found: closer.name.clone(),
                        },
                        start,
                    );
                    continue;
                }

                builder.push_gap(cursor..start);
                let open = &body[token.span.clone()];
                let close = &body[closer.span.clone()];
                let inner = &body[token.span.end..closer.span.start];
                let mut block = Block::new(&token.name, attributes.clone(), inner);
                block.raw = Some(RawMarkers::new(
                    open,
                    close,
                    &token.name,
                    attributes,
                    false,
                ));
                builder.push_block(block);
                cursor = closer.span.end;
                index = closer_index + 1;
            }
        }
    }

    builder.push_gap(cursor..body.len());
    builder.finish()
}
