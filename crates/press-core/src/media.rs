//! Media references inside documents
//!
//! Rules that build blocks pointing at external media introduce new URLs.
//! The runner fetches each newly referenced asset before writing, so a
//! document never points at media that cannot be retrieved.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use press_blocks::{Block, Document};
use regex::Regex;
use serde_json::Value;

static SRC_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bsrc\s*=\s*["'](https?://[^"']+)["']"#).expect("Invalid media src regex")
});

/// Attribute keys whose string values are media URLs.
const URL_ATTRIBUTES: &[&str] = &["url", "src", "href"];

fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn block_urls(block: &Block, urls: &mut BTreeSet<String>) {
    for key in URL_ATTRIBUTES {
        if let Some(Value::String(url)) = block.attribute(key)
            && is_remote(url)
        {
            urls.insert(url.clone());
        }
    }
    for caps in SRC_REGEX.captures_iter(&block.inner_markup) {
        if let Some(url) = caps.get(1) {
            urls.insert(url.as_str().to_string());
        }
    }
}

/// Every remote media URL a document references.
pub fn media_urls(doc: &Document) -> BTreeSet<String> {
    let mut urls = BTreeSet::new();
    for block in doc.blocks() {
        block_urls(block, &mut urls);
    }
    urls
}
