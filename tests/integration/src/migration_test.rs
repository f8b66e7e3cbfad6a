//! End-to-end migration over a directory store
//!
//! This test exercises the complete flow: config loading -> rule compilation
//! -> run over the store -> run log -> resumed rerun.

use pretty_assertions::assert_eq;
use press_core::{DocumentOutcome, MigrationConfig, RuleRegistry, Runner};
use press_store::{DirectoryStore, DocumentStore, JsonLinesLog, Severity};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CONFIG: &str = r#"
name = "banners-2024"
store = "bodies"
log = "logs/banners.jsonl"

[fetch]
mirror = "mirror"

[fetch.retry]
initial_interval_ms = 1
max_interval_ms = 2
max_elapsed_ms = 20

[[rules]]
action = "delete"
name = "remove-donation-embeds"
match = { kind = "html", inner_contains = "donorbox.org" }

[[rules]]
action = "replace_with"
name = "spring-banner"
match = { kind = "html", inner_contains = "legacy-banner" }
block = { kind = "image", attributes = { url = "https://cdn.example.org/banners/spring.jpg" }, void = true }

[[rules]]
action = "replace_with"
name = "promo-banner"
match = { kind = "html", inner_contains = "legacy-promo" }
block = { kind = "image", attributes = { url = "https://cdn.example.org/banners/promo.jpg" }, void = true }
"#;

const BANNER: &str = "<!-- wp:paragraph -->\n<p>Spring is here.</p>\n<!-- /wp:paragraph -->\n\n<!-- wp:html -->\n<div class=\"legacy-banner\"></div>\n<!-- /wp:html -->\n";

const PROMO: &str = "<!-- wp:paragraph -->\n<p>Sale!</p>\n<!-- /wp:paragraph -->\n\n<!-- wp:html -->\n<div class=\"legacy-promo\"></div>\n<!-- /wp:html -->\n";

const CLEAN: &str = "<!-- wp:paragraph -->\n<p>Nothing to see.</p>\n<!-- /wp:paragraph -->\n";

const MALFORMED: &str = "<p>Intro</p>\n<!-- /wp:quote -->\n\n<!-- wp:html -->\n<script src=\"https://donorbox.org/w.js\"></script>\n<!-- /wp:html -->\n\n<!-- wp:paragraph -->\n<p>Body</p>\n<!-- /wp:paragraph -->\n";

/// Set up a migration directory with a config, four bodies and a mirror
/// holding the spring banner only
fn setup() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("migration.toml"), CONFIG).unwrap();

    let bodies = temp.path().join("bodies");
    fs::create_dir_all(&bodies).unwrap();
    for (id, body) in [
        ("post-a", BANNER),
        ("post-b", PROMO),
        ("post-c", CLEAN),
        ("post-d", MALFORMED),
    ] {
        fs::write(bodies.join(format!("{id}.html")), body).unwrap();
    }

    mirror(temp.path(), "spring.jpg");
    temp
}

fn mirror(root: &Path, file: &str) {
    let dir = root.join("mirror/cdn.example.org/banners");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(file), b"jpeg").unwrap();
}

fn run(config: &MigrationConfig) -> press_core::RunSummary {
    let runner = Runner::from_config(config, &RuleRegistry::new()).unwrap();
    let mut store = DirectoryStore::open(&config.store).unwrap();
    let mut log = JsonLinesLog::new(config.log.clone().unwrap());
    runner.run(&mut store, &mut log).unwrap()
}

#[test]
fn test_full_migration_flow() {
    let temp = setup();
    let config = MigrationConfig::load(&temp.path().join("migration.toml")).unwrap();
    let store = DirectoryStore::open(&config.store).unwrap();

    // First pass: one document waits on missing media
    let summary = run(&config);
    assert_eq!(summary.considered, 4);
    assert_eq!(summary.changed, 2);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.failed, 1);

    assert_eq!(
        store.get_body("post-a").unwrap(),
        "<!-- wp:paragraph -->\n<p>Spring is here.</p>\n<!-- /wp:paragraph -->\n\n<!-- wp:image {\"url\":\"https://cdn.example.org/banners/spring.jpg\"} /-->\n"
    );
    assert_eq!(store.get_body("post-b").unwrap(), PROMO);
    assert_eq!(store.get_body("post-c").unwrap(), CLEAN);
    assert_eq!(
        store.get_body("post-d").unwrap(),
        "<p>Intro</p>\n<!-- /wp:quote -->\n\n<!-- wp:paragraph -->\n<p>Body</p>\n<!-- /wp:paragraph -->\n"
    );

    assert!(matches!(
        &summary.document("post-b").unwrap().outcome,
        DocumentOutcome::Failed { reason } if reason.contains("media not retrievable")
    ));
    assert_eq!(summary.document("post-d").unwrap().ambiguities, 1);
    assert!(!store.has_flag("post-b", "banners-2024").unwrap());
    assert!(store.has_flag("post-c", "banners-2024").unwrap());

    let entries = JsonLinesLog::read(config.log.as_deref().unwrap()).unwrap();
    let warned: Vec<_> = entries
        .iter()
        .filter(|e| e.severity == Severity::Warning)
        .map(|e| e.category.as_str())
        .collect();
    assert_eq!(warned, vec!["post-b", "post-d"]);

    // Second pass: only the failed document is retried
    let summary = run(&config);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.failed, 1);

    // The asset arrives; the retry succeeds
    mirror(temp.path(), "promo.jpg");
    let summary = run(&config);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.changed, 1);
    assert!(store.get_body("post-b").unwrap().contains("promo.jpg"));
    assert!(store.has_flag("post-b", "banners-2024").unwrap());

    // Three runs appended to one log, each with its own run id
    let entries = JsonLinesLog::read(config.log.as_deref().unwrap()).unwrap();
    let mut runs: Vec<_> = entries.iter().map(|e| e.run_id).collect();
    runs.dedup();
    assert_eq!(runs.len(), 3);
}

#[test]
fn test_dry_run_leaves_store_untouched() {
    let temp = setup();
    let mut config = MigrationConfig::load(&temp.path().join("migration.toml")).unwrap();
    config.dry_run = true;

    let summary = run(&config);
    assert_eq!(summary.would_change, 2);

    let store = DirectoryStore::open(&config.store).unwrap();
    assert_eq!(store.get_body("post-a").unwrap(), BANNER);
    for id in store.ids().unwrap() {
        assert!(!store.has_flag(&id, "banners-2024").unwrap());
    }

    let DocumentOutcome::WouldChange { diff, .. } = &summary.document("post-a").unwrap().outcome
    else {
        panic!("expected a preview for post-a");
    };
    assert!(diff.contains("+<!-- wp:image {\"url\":\"https://cdn.example.org/banners/spring.jpg\"} /-->"));
}
