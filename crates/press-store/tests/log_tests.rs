use pretty_assertions::assert_eq;
use press_store::{JsonLinesLog, RunLog, Severity};
use tempfile::TempDir;

#[test]
fn test_json_lines_log_appends_records() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("logs").join("run.jsonl");

    let mut log = JsonLinesLog::new(&path);
    log.info("post-1", "changed").unwrap();
    log.warning("post-2", "unterminated block at byte 40").unwrap();

    let entries = JsonLinesLog::read(&path).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].category, "post-1");
    assert_eq!(entries[1].severity, Severity::Warning);
    assert!(entries.iter().all(|e| e.run_id == log.run_id()));
    assert!(entries[0].timestamp <= entries[1].timestamp);
}

#[test]
fn test_json_lines_log_keeps_previous_runs() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("run.jsonl");

    JsonLinesLog::new(&path).info("run", "first").unwrap();
    JsonLinesLog::new(&path).info("run", "second").unwrap();

    let entries = JsonLinesLog::read(&path).unwrap();
    assert_eq!(entries.len(), 2);
    assert_ne!(entries[0].run_id, entries[1].run_id);
}

#[test]
fn test_json_lines_format() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("run.jsonl");
    JsonLinesLog::new(&path).error("post-7", "write failed").unwrap();

    let line = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
    assert_eq!(value["severity"], "error");
    assert_eq!(value["message"], "write failed");
    assert!(line.ends_with('\n'));
}
