//! Text diffs for dry-run previews

use similar::{ChangeTag, TextDiff};

/// Lines added and removed between two bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineChanges {
    pub added: usize,
    pub removed: usize,
}

/// Unified diff of a document body, with `a/<id>` and `b/<id>` headers.
pub fn unified_diff(id: &str, old: &str, new: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    diff.unified_diff()
        .context_radius(2)
        .header(&format!("a/{id}"), &format!("b/{id}"))
        .to_string()
}

pub fn line_changes(old: &str, new: &str) -> LineChanges {
    let mut changes = LineChanges::default();
    if old == new {
        return changes;
    }
    for change in TextDiff::from_lines(old, new).iter_all_changes() {
        match change.tag() {
            ChangeTag::Delete => changes.removed += 1,
            ChangeTag::Insert => changes.added += 1,
            ChangeTag::Equal => {}
        }
    }
    changes
}
