//! Several workers migrating one store concurrently
//!
//! Each worker owns a disjoint partition of document ids and appends to a
//! shared run log.

use press_core::{MigrationConfig, Partition, RuleRegistry, Runner};
use press_store::{DirectoryStore, DocumentStore, JsonLinesLog};
use std::fs;
use std::thread;
use tempfile::TempDir;

const CONFIG: &str = r#"
name = "strip-related"
store = "bodies"
log = "run.jsonl"

[[rules]]
action = "truncate_from"
name = "strip-related-stories"
match = { kind = "heading", text_contains = "related stories" }
"#;

const WORKERS: u32 = 3;
const DOCUMENTS: usize = 30;

fn body(n: usize) -> String {
    format!(
        "<!-- wp:paragraph -->\n<p>Story {n}</p>\n<!-- /wp:paragraph -->\n\n<!-- wp:heading -->\n<h2>Related stories</h2>\n<!-- /wp:heading -->\n\n<!-- wp:list -->\n<ul><li>Old</li></ul>\n<!-- /wp:list -->\n"
    )
}

#[test]
fn test_partitioned_workers_cover_store_once() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("migration.toml");
    fs::write(&config_path, CONFIG).unwrap();
    let bodies = temp.path().join("bodies");
    fs::create_dir_all(&bodies).unwrap();
    for n in 0..DOCUMENTS {
        fs::write(bodies.join(format!("post-{n:02}.html")), body(n)).unwrap();
    }

    let handles: Vec<_> = (0..WORKERS)
        .map(|index| {
            let config_path = config_path.clone();
            thread::spawn(move || {
                let mut config = MigrationConfig::load(&config_path).unwrap();
                config.partition = Partition::new(index, WORKERS).unwrap();
                let runner = Runner::from_config(&config, &RuleRegistry::new()).unwrap();
                let mut store = DirectoryStore::open(&config.store).unwrap();
                let mut log = JsonLinesLog::new(config.log.clone().unwrap());
                runner.run(&mut store, &mut log).unwrap()
            })
        })
        .collect();

    let summaries: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let considered: usize = summaries.iter().map(|s| s.considered).sum();
    let changed: usize = summaries.iter().map(|s| s.changed).sum();
    assert_eq!(considered, DOCUMENTS);
    assert_eq!(changed, DOCUMENTS);

    let store = DirectoryStore::open(&bodies).unwrap();
    for (n, id) in store.ids().unwrap().iter().enumerate() {
        assert_eq!(
            store.get_body(id).unwrap(),
            format!("<!-- wp:paragraph -->\n<p>Story {n}</p>\n<!-- /wp:paragraph -->\n")
        );
        assert!(store.has_flag(id, "strip-related").unwrap());
    }

    // Every line parses: concurrent appends never interleave
    let entries = JsonLinesLog::read(&temp.path().join("run.jsonl")).unwrap();
    assert_eq!(entries.len(), DOCUMENTS + 2 * WORKERS as usize);
    for n in 0..DOCUMENTS {
        let id = format!("post-{n:02}");
        assert_eq!(entries.iter().filter(|e| e.category == id).count(), 1);
    }
}
