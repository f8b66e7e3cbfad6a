use press_store::{ConfigStore, Error};
use serde::{Deserialize, Serialize};
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct TestConfig {
    name: String,
    count: i32,
}

#[test]
fn test_load_toml() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    fs::write(&path, "name = \"test\"\ncount = 42").unwrap();

    let config: TestConfig = ConfigStore::new().load(&path).unwrap();
    assert_eq!(config, TestConfig { name: "test".into(), count: 42 });
}

#[test]
fn test_load_json() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    fs::write(&path, r#"{"name": "test", "count": 42}"#).unwrap();

    let config: TestConfig = ConfigStore::new().load(&path).unwrap();
    assert_eq!(config.count, 42);
}

#[test]
fn test_load_yaml() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.YML");
    fs::write(&path, "name: test\ncount: 42").unwrap();

    let config: TestConfig = ConfigStore::new().load(&path).unwrap();
    assert_eq!(config.name, "test");
}

#[test]
fn test_save_and_reload_toml() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("config.toml");
    let store = ConfigStore::new();
    let config = TestConfig { name: "saved".into(), count: 7 };

    store.save(&path, &config).unwrap();
    let loaded: TestConfig = store.load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_parse_error_names_format() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    fs::write(&path, "name = ").unwrap();

    let err = ConfigStore::new().load::<TestConfig>(&path).unwrap_err();
    match err {
        Error::ConfigParse { format, .. } => assert_eq!(format, "TOML"),
        other => panic!("expected ConfigParse, got {other:?}"),
    }
}

#[test]
fn test_unsupported_extension() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.ini");
    let result = ConfigStore::new().load::<TestConfig>(&path);
    assert!(matches!(result, Err(Error::UnsupportedFormat { extension }) if extension == "ini"));

    let result = ConfigStore::new().save(&path, &TestConfig { name: "x".into(), count: 1 });
    assert!(matches!(result, Err(Error::UnsupportedFormat { .. })));
}
