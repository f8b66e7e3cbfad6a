//! Code-defined rules shipped with the binary
//!
//! Configs run by `press` reference these with `action = "custom"`:
//!
//! ```toml
//! [[rules]]
//! action = "custom"
//! name = "drop-empty-paragraphs"
//! ```

use press_blocks::{Block, Document, FnRule, markup};
use press_core::RuleRegistry;

pub const DROP_EMPTY_PARAGRAPHS: &str = "drop-empty-paragraphs";
pub const DROP_TRAILING_SEPARATORS: &str = "drop-trailing-separators";

/// Every rule `action = "custom"` can name when run through `press`.
pub fn registry() -> RuleRegistry {
    RuleRegistry::new()
        .with(DROP_EMPTY_PARAGRAPHS, || {
            Box::new(FnRule::new(DROP_EMPTY_PARAGRAPHS, drop_empty_paragraphs))
        })
        .with(DROP_TRAILING_SEPARATORS, || {
            Box::new(FnRule::new(DROP_TRAILING_SEPARATORS, drop_trailing_separators))
        })
}

/// Paragraphs with no text once tags and `&nbsp;` are gone.
fn is_empty_paragraph(block: &Block) -> bool {
    block.is("paragraph")
        && markup::strip_tags(&block.inner_markup)
            .replace("&nbsp;", "")
            .replace('\u{a0}', "")
            .trim()
            .is_empty()
}

fn drop_empty_paragraphs(doc: &mut Document) -> press_blocks::Result<usize> {
    let mut edits = 0;
    let mut from = 0;
    while let Some(index) = doc.find_first_from(from, is_empty_paragraph) {
        edits += usize::from(doc.delete(index).is_applied());
        from = index;
    }
    Ok(edits)
}

fn drop_trailing_separators(doc: &mut Document) -> press_blocks::Result<usize> {
    let mut edits = 0;
    while let Some(last) = doc.len().checked_sub(1)
        && doc
            .block(last)
            .is_some_and(|b| b.is("separator") || b.is("spacer"))
    {
        if !doc.delete(last).is_applied() {
            break;
        }
        edits += 1;
    }
    Ok(edits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use press_blocks::{Rule, parse};

    fn apply(name: &str, body: &str) -> (usize, String) {
        let rule = registry().build(name).unwrap();
        let mut doc = parse(body);
        let edits = rule.apply(&mut doc).unwrap();
        assert_eq!(rule.apply(&mut doc).unwrap(), 0);
        (edits, doc.serialize())
    }

    #[test]
    fn registry_names() {
        assert_eq!(
            registry().names(),
            vec![DROP_EMPTY_PARAGRAPHS, DROP_TRAILING_SEPARATORS]
        );
    }

    #[test]
    fn empty_paragraphs_are_dropped() {
        let body = "<!-- wp:paragraph --><p>Story</p><!-- /wp:paragraph -->\n\n<!-- wp:paragraph --><p>&nbsp;</p><!-- /wp:paragraph -->\n\n<!-- wp:paragraph --><p> <br/></p><!-- /wp:paragraph -->\n";
        let (edits, output) = apply(DROP_EMPTY_PARAGRAPHS, body);
        assert_eq!(edits, 2);
        assert_eq!(output, "<!-- wp:paragraph --><p>Story</p><!-- /wp:paragraph -->\n");
    }

    #[test]
    fn only_trailing_separators_are_dropped() {
        let body = "<!-- wp:separator /-->\n\n<!-- wp:paragraph --><p>Story</p><!-- /wp:paragraph -->\n\n<!-- wp:separator /-->\n\n<!-- wp:spacer /-->\n";
        let (edits, output) = apply(DROP_TRAILING_SEPARATORS, body);
        assert_eq!(edits, 2);
        assert_eq!(
            output,
            "<!-- wp:separator /-->\n\n<!-- wp:paragraph --><p>Story</p><!-- /wp:paragraph -->\n"
        );
    }
}
