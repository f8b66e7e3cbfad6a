//! Integration tests for block parsing.

use pretty_assertions::assert_eq;
use press_blocks::{AmbiguityKind, parse};
use rstest::rstest;
use serde_json::json;

const ARTICLE: &str = r#"<!-- wp:heading {"level":2} -->
<h2>Council approves budget</h2>
<!-- /wp:heading -->

<!-- wp:paragraph -->
<p>The council voted 7-2 on Tuesday.</p>
<!-- /wp:paragraph -->

<!-- wp:image {"id":4211,"sizeSlug":"large"} /-->

<!-- wp:jetpack/slideshow {"ids":[1,2,3]} -->
<div class="wp-block-jetpack-slideshow"></div>
<!-- /wp:jetpack/slideshow -->
"#;

#[test]
fn test_article_blocks_in_order() {
    let doc = parse(ARTICLE);
    let kinds: Vec<_> = doc.blocks().iter().map(|b| b.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            "core/heading",
            "core/paragraph",
            "core/image",
            "jetpack/slideshow"
        ]
    );
    assert!(doc.ambiguities().is_empty());
}

#[test]
fn test_attributes_are_parsed() {
    let doc = parse(ARTICLE);
    assert_eq!(doc.blocks()[0].attribute("level"), Some(&json!(2)));
    assert_eq!(doc.blocks()[2].attribute("id"), Some(&json!(4211)));
    assert!(doc.blocks()[2].is_void());
    assert_eq!(doc.blocks()[3].attribute("ids"), Some(&json!([1, 2, 3])));
}

#[test]
fn test_inner_markup_is_verbatim() {
    let doc = parse(ARTICLE);
    assert_eq!(
        doc.blocks()[1].inner_markup,
        "\n<p>The council voted 7-2 on Tuesday.</p>\n"
    );
}

#[test]
fn test_separators_and_trailer_preserved() {
    let doc = parse(ARTICLE);
    assert_eq!(doc.blocks()[0].separator(), "");
    assert_eq!(doc.blocks()[1].separator(), "\n\n");
    assert_eq!(doc.trailer(), "\n");
    assert_eq!(doc.serialize(), ARTICLE);
}

#[test]
fn test_nested_blocks_stay_opaque() {
    let body = "<!-- wp:group --><div><!-- wp:paragraph --><p>x</p><!-- /wp:paragraph --></div><!-- /wp:group -->";
    let doc = parse(body);
    assert_eq!(doc.len(), 1);
    assert!(doc.blocks()[0].is("group"));
    assert_eq!(
        doc.blocks()[0].inner_markup,
        "<div><!-- wp:paragraph --><p>x</p><!-- /wp:paragraph --></div>"
    );
}

#[test]
fn test_same_name_nesting_matches_outer_closer() {
    let body = "<!-- wp:column --><!-- wp:column -->a<!-- /wp:column --><!-- /wp:column -->tail";
    let doc = parse(body);
    assert_eq!(doc.len(), 2);
    assert_eq!(
        doc.blocks()[0].inner_markup,
        "<!-- wp:column -->a<!-- /wp:column -->"
    );
    assert!(doc.blocks()[1].is_freeform());
    assert_eq!(doc.blocks()[1].inner_markup, "tail");
}

#[test]
fn test_freeform_between_blocks() {
    let body = "<p>legacy intro</p>\n<!-- wp:separator /-->\n<p>legacy outro</p>";
    let doc = parse(body);
    let kinds: Vec<_> = doc.blocks().iter().map(|b| b.kind()).collect();
    assert_eq!(kinds, vec!["none", "core/separator", "none"]);
    assert_eq!(doc.blocks()[0].inner_markup, "<p>legacy intro</p>\n");
    assert_eq!(doc.serialize(), body);
}

#[rstest]
#[case::unterminated(
    "<!-- wp:paragraph --><p>never closed</p>",
    AmbiguityKind::UnterminatedBlock { name: "core/paragraph".into() }
)]
#[case::stray_closer(
    "<p>x</p><!-- /wp:quote -->",
    AmbiguityKind::StrayCloser { name: "core/quote".into() }
)]
#[case::mismatched(
    "<!-- wp:quote --><p>x</p><!-- /wp:pullquote -->",
    AmbiguityKind::MismatchedCloser { expected: "core/quote".into(), found: "core/pullquote".into() }
)]
#[case::invalid_json(
    "<!-- wp:image {id:4} /-->",
    AmbiguityKind::InvalidAttributes
)]
#[case::trailing_garbage(
    "<!-- wp:image {\"a\":1} extra } /-->",
    AmbiguityKind::InvalidAttributes
)]
fn test_malformed_markers_degrade(#[case] body: &str, #[case] expected: AmbiguityKind) {
    let doc = parse(body);
    assert_eq!(doc.ambiguities()[0].kind, expected);
    assert_eq!(doc.ambiguities()[0].offset, body.find("<!--").unwrap());
    assert_eq!(doc.serialize(), body);
}

#[test]
fn test_unterminated_block_keeps_later_blocks() {
    let body = "<!-- wp:paragraph --><p>broken</p>\n\n<!-- wp:separator /-->\n";
    let doc = parse(body);
    assert_eq!(doc.len(), 2);
    assert!(doc.blocks()[0].is_freeform());
    assert!(doc.blocks()[1].is("separator"));
    assert_eq!(doc.serialize(), body);
}

#[test]
fn test_marker_names_are_lowercase_only() {
    let doc = parse("<!-- wp:Paragraph --><p>x</p><!-- /wp:Paragraph -->");
    assert_eq!(doc.len(), 1);
    assert!(doc.blocks()[0].is_freeform());
    assert!(doc.ambiguities().is_empty());
}

#[test]
fn test_multibyte_text_around_markers() {
    let body = "café ☕\n<!-- wp:paragraph --><p>naïve</p><!-- /wp:paragraph -->\n日本";
    let doc = parse(body);
    assert_eq!(doc.len(), 3);
    assert_eq!(doc.serialize(), body);
}

#[test]
fn test_escaped_attributes_decode() {
    let doc = parse(r#"<!-- wp:html {"note":"a\u002d\u002db \u003cc\u003e"} /-->"#);
    assert_eq!(doc.blocks()[0].attribute("note"), Some(&json!("a--b <c>")));
}

#[test]
fn test_many_unterminated_openers_parse_in_linear_time() {
    let body = "<!-- wp:html -->x".repeat(4000);
    let started = std::time::Instant::now();
    let doc = parse(&body);
    assert!(started.elapsed() < std::time::Duration::from_secs(2));
    assert_eq!(doc.ambiguities().len(), 4000);
    assert_eq!(doc.serialize(), body);
}

#[test]
fn test_unclosed_attribute_object_stops_at_comment_end() {
    let body = format!("{}<!-- wp:spacer /-->", r#"<!-- wp:html {"a":1 -->x"#.repeat(2000));
    let started = std::time::Instant::now();
    let doc = parse(&body);
    assert!(started.elapsed() < std::time::Duration::from_secs(2));
    assert!(doc.blocks().last().unwrap().is("spacer"));
    assert_eq!(doc.serialize(), body);
}
