//! Parsed document and block-level edit operations

use crate::block::Block;
use crate::edit::{Edit, EditKind, EditStatus};
use crate::error::{Error, Result};
use crate::parser::{self, ParseAmbiguity};
use crate::serializer;

/// Separator placed before blocks inserted by [`Document::insert`].
pub const DEFAULT_SEPARATOR: &str = "\n\n";

/// An ordered sequence of top-level blocks parsed from one stored body.
///
/// A document is built per operation, mutated in memory, serialized once
/// and discarded. Callers should persist the result only when
/// [`is_modified`](Self::is_modified) reports a change.
#[derive(Debug, Clone)]
pub struct Document {
    blocks: Vec<Block>,
    /// Whitespace after the last block
    trailer: String,
    /// Body as provided to parse (for is_modified tracking)
    original: String,
    ambiguities: Vec<ParseAmbiguity>,
    edits: Vec<Edit>,
}

impl Document {
    pub(crate) fn from_parts(
        blocks: Vec<Block>,
        trailer: String,
        original: &str,
        ambiguities: Vec<ParseAmbiguity>,
    ) -> Self {
        Self {
            blocks,
            trailer,
            original: original.to_string(),
            ambiguities,
            edits: Vec::new(),
        }
    }

    /// Parse a body. Never fails; see [`parser::parse`].
    pub fn parse(body: &str) -> Self {
        parser::parse(body)
    }

    /// Parse a body and check that serializing it reproduces the input.
    ///
    /// # Errors
    ///
    /// Returns `RoundTripMismatch` if the untouched document does not
    /// serialize back to `body`. This signals a parser bug and callers
    /// should treat it as fatal.
    pub fn parse_verified(body: &str) -> Result<Self> {
        let doc = parser::parse(body);
        let rendered = doc.serialize();
        if rendered != body {
            let offset = rendered
                .bytes()
                .zip(body.bytes())
                .position(|(a, b)| a != b)
                .unwrap_or_else(|| rendered.len().min(body.len()));
            return Err(Error::RoundTripMismatch {
                offset,
                expected_len: body.len(),
                actual_len: rendered.len(),
            });
        }
        Ok(doc)
    }

    /// Build a document from freshly constructed blocks, separated by
    /// [`DEFAULT_SEPARATOR`].
    pub fn from_blocks(blocks: impl IntoIterator<Item = Block>) -> Self {
        let blocks = blocks
            .into_iter()
            .enumerate()
            .map(|(i, mut block)| {
                block.separator = if i == 0 {
                    String::new()
                } else {
                    DEFAULT_SEPARATOR.to_string()
                };
                block
            })
            .collect();
        Self::from_parts(blocks, String::new(), "", Vec::new())
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn block_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.blocks.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Whitespace after the last block.
    pub fn trailer(&self) -> &str {
        &self.trailer
    }

    /// The body this document was parsed from.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Markers the parser recovered from while reading the body.
    pub fn ambiguities(&self) -> &[ParseAmbiguity] {
        &self.ambiguities
    }

    /// Edits applied since parsing, in order.
    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    /// Render to the textual body.
    pub fn serialize(&self) -> String {
        serializer::serialize(self)
    }

    /// Check if the serialized document differs from the parsed body.
    pub fn is_modified(&self) -> bool {
        self.serialize() != self.original
    }

    /// Index of the first block matching `predicate`, or `None`.
    pub fn find_first(&self, predicate: impl Fn(&Block) -> bool) -> Option<usize> {
        self.find_first_from(0, predicate)
    }

    /// Index of the first block at or after `start` matching `predicate`.
    pub fn find_first_from(
        &self,
        start: usize,
        predicate: impl Fn(&Block) -> bool,
    ) -> Option<usize> {
        self.blocks
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, block)| predicate(block))
            .map(|(index, _)| index)
    }

    /// Indices of every block matching `predicate`.
    pub fn find_all(&self, predicate: impl Fn(&Block) -> bool) -> Vec<usize> {
        self.blocks
            .iter()
            .enumerate()
            .filter(|(_, block)| predicate(block))
            .map(|(index, _)| index)
            .collect()
    }

    fn out_of_range(&self, index: usize) -> EditStatus {
        EditStatus::OutOfRange {
            index,
            len: self.blocks.len(),
        }
    }

    fn record(&mut self, kind: EditKind, index: usize) -> EditStatus {
        self.edits.push(Edit { kind, index });
        EditStatus::Applied
    }

    /// Substitute the block at `index`, keeping the old block's separator.
    pub fn replace(&mut self, index: usize, mut block: Block) -> EditStatus {
        let Some(current) = self.blocks.get_mut(index) else {
            return self.out_of_range(index);
        };
        if current.to_markup() == block.to_markup() {
            return EditStatus::Unchanged;
        }
        block.separator = std::mem::take(&mut current.separator);
        *current = block;
        self.record(EditKind::Replace, index)
    }

    /// Remove the block at `index`; later blocks shift down by one.
    ///
    /// The removed block's separator goes with it, except for the first
    /// block, whose separator is handed to the new first block.
    pub fn delete(&mut self, index: usize) -> EditStatus {
        if index >= self.blocks.len() {
            return self.out_of_range(index);
        }
        let removed = self.blocks.remove(index);
        if index == 0
            && let Some(first) = self.blocks.first_mut()
        {
            first.separator = removed.separator;
        }
        self.record(EditKind::Delete, index)
    }

    /// Remove the block at `index` and every block after it.
    pub fn truncate_from(&mut self, index: usize) -> EditStatus {
        if index >= self.blocks.len() {
            return self.out_of_range(index);
        }
        let removed = self.blocks.len() - index;
        self.blocks.truncate(index);
        self.record(EditKind::Truncate { removed }, index)
    }

    /// Replace the inner markup of the block at `index` with
    /// `transform(inner_markup)`.
    pub fn rewrite_inner<F>(&mut self, index: usize, transform: F) -> EditStatus
    where
        F: FnOnce(&str) -> String,
    {
        let Some(block) = self.blocks.get_mut(index) else {
            return self.out_of_range(index);
        };
        let rewritten = transform(&block.inner_markup);
        if rewritten == block.inner_markup {
            return EditStatus::Unchanged;
        }
        block.set_inner_markup(rewritten);
        self.record(EditKind::RewriteInner, index)
    }

    /// Insert `block` before `index`; `index == len()` appends.
    pub fn insert(&mut self, index: usize, mut block: Block) -> EditStatus {
        if index > self.blocks.len() {
            return self.out_of_range(index);
        }
        if index == 0 {
            match self.blocks.first_mut() {
                Some(first) => {
                    block.separator = std::mem::take(&mut first.separator);
                    first.separator = DEFAULT_SEPARATOR.to_string();
                }
                None => block.separator = String::new(),
            }
        } else {
            block.separator = DEFAULT_SEPARATOR.to_string();
        }
        self.blocks.insert(index, block);
        self.record(EditKind::Insert, index)
    }

    /// One line per block: index, kind, attributes and inner size.
    pub fn outline(&self) -> String {
        self.blocks
            .iter()
            .enumerate()
            .map(|(index, block)| {
                let attrs = if block.attributes.is_empty() {
                    "-".to_string()
                } else {
                    serializer::serialize_attributes(&block.attributes)
                };
                format!(
                    "{index} {} {attrs} ({} bytes)",
                    block.kind(),
                    block.inner_markup.len()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
