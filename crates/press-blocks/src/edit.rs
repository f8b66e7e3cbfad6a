//! Edit records and statuses for block-level operations.

use serde::{Deserialize, Serialize};

/// The kind of edit applied to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditKind {
    /// One block substituted for another.
    Replace,
    /// One block removed.
    Delete,
    /// A block and every block after it removed.
    Truncate { removed: usize },
    /// Inner markup of one block rewritten.
    RewriteInner,
    /// A new block inserted.
    Insert,
}

/// An edit that changed a document, in application order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    pub kind: EditKind,
    /// Block index the edit applied to, at the time it was applied
    pub index: usize,
}

/// Result of a single block-level operation.
///
/// An index past the end is a status, not an error: the operation is a no-op
/// and the caller decides whether that matters.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EditStatus {
    /// The document changed.
    Applied,
    /// The operation ran but produced identical content.
    Unchanged,
    /// The index was outside the document; nothing happened.
    OutOfRange { index: usize, len: usize },
}

impl EditStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::OutOfRange { .. })
    }
}
