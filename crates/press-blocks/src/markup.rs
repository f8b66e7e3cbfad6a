//! Text helpers for rewriting opaque inner markup.
//!
//! These back [`Document::rewrite_inner`](crate::Document::rewrite_inner)
//! transforms: search-and-remove over raw HTML without building a DOM.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;

static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("Invalid tag regex"));

/// Remove every HTML tag, keeping text content.
pub fn strip_tags(html: &str) -> String {
    TAG_REGEX.replace_all(html, "").into_owned()
}

/// Remove every occurrence of a literal substring.
///
/// Removal repeats until the needle no longer occurs, so pieces joined by
/// one pass (`"ab"` out of `"aabb"`) are removed too.
pub fn remove_text(html: &str, needle: &str) -> String {
    let mut text = html.to_string();
    if needle.is_empty() {
        return text;
    }
    while text.contains(needle) {
        text = text.replace(needle, "");
    }
    text
}

/// Builds the pattern for opening and closing tags named `tag`.
fn tag_pattern(tag: &str) -> Result<Regex> {
    let pattern = format!(r"(?is)<(/)?{}\b[^>]*>", regex::escape(tag));
    Ok(Regex::new(&pattern)?)
}

/// Byte ranges of the `tag` elements whose opening tag contains `needle`.
///
/// Elements are matched with their balanced closing tag. Self-closing
/// (`<tag ... />`) elements span only their tag; elements with no closing
/// tag are left alone.
fn element_ranges(html: &str, tag: &str, needle: &str) -> Result<Vec<std::ops::Range<usize>>> {
    let tags = tag_pattern(tag)?;
    let mut ranges = Vec::new();
    let mut from = 0;

    while let Some(caps) = tags.captures_at(html, from) {
        let Some(open) = caps.get(0) else { break };
        from = open.end();

        if caps.get(1).is_some() || !open.as_str().contains(needle) {
            continue;
        }
        if open.as_str().ends_with("/>") {
            ranges.push(open.range());
            continue;
        }

        let mut depth = 1usize;
        let mut scan = open.end();
        let mut end = None;
        while let Some(inner) = tags.captures_at(html, scan) {
            let Some(m) = inner.get(0) else { break };
            scan = m.end();
            if inner.get(1).is_some() {
                depth -= 1;
                if depth == 0 {
                    end = Some(m.end());
                    break;
                }
            } else if !m.as_str().ends_with("/>") {
                depth += 1;
            }
        }

        if let Some(end) = end {
            ranges.push(open.start()..end);
            from = end;
        }
    }

    Ok(ranges)
}

/// Remove `<tag>` elements (with their content) whose opening tag contains
/// `needle`, e.g. `remove_elements(html, "div", "donate-widget")`.
///
/// # Errors
///
/// Returns an error if the tag pattern cannot be compiled.
pub fn remove_elements(html: &str, tag: &str, needle: &str) -> Result<String> {
    let ranges = element_ranges(html, tag, needle)?;
    if ranges.is_empty() {
        return Ok(html.to_string());
    }

    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for range in ranges {
        out.push_str(&html[last..range.start]);
        last = range.end;
    }
    out.push_str(&html[last..]);
    Ok(out)
}

/// Check whether any `<tag>` element's opening tag contains `needle`.
pub fn contains_element(html: &str, tag: &str, needle: &str) -> Result<bool> {
    Ok(!element_ranges(html, tag, needle)?.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_tags_keeps_text() {
        assert_eq!(strip_tags("<h2>Related <em>stories</em></h2>"), "Related stories");
    }

    #[test]
    fn remove_text_ignores_empty_needle() {
        assert_eq!(remove_text("abc", ""), "abc");
        assert_eq!(remove_text("a&nbsp;b&nbsp;", "&nbsp;"), "ab");
    }

    #[test]
    fn remove_text_removes_joined_occurrences() {
        assert_eq!(remove_text("aabb", "ab"), "");
        assert_eq!(remove_text("xaaabbby", "ab"), "xy");
        assert_eq!(remove_text("&nb&nbsp;sp;x", "&nbsp;"), "x");
    }

    #[test]
    fn remove_elements_handles_nesting() {
        let html = r#"<p>a</p><div class="donate"><div>inner</div></div><p>b</p>"#;
        assert_eq!(
            remove_elements(html, "div", "donate").unwrap(),
            "<p>a</p><p>b</p>"
        );
    }

    #[test]
    fn remove_elements_leaves_other_elements() {
        let html = r#"<div class="keep">x</div><div class="donate">y</div>"#;
        assert_eq!(
            remove_elements(html, "div", "donate").unwrap(),
            r#"<div class="keep">x</div>"#
        );
    }

    #[test]
    fn remove_elements_self_closing() {
        let html = r#"<p>x<img src="pixel.gif" /></p>"#;
        assert_eq!(remove_elements(html, "img", "pixel").unwrap(), "<p>x</p>");
    }

    #[test]
    fn unclosed_element_is_left_alone() {
        let html = r#"<div class="donate">never closed"#;
        assert_eq!(remove_elements(html, "div", "donate").unwrap(), html);
    }

    #[test]
    fn tag_prefix_does_not_match_longer_names() {
        let html = r#"<divider class="donate"></divider>"#;
        assert_eq!(remove_elements(html, "div", "donate").unwrap(), html);
    }

    #[test]
    fn contains_element_reports_matches() {
        let html = r#"<script src="https://donorbox.org/widget.js"></script>"#;
        assert!(contains_element(html, "script", "donorbox").unwrap());
        assert!(!contains_element(html, "iframe", "donorbox").unwrap());
    }
}
