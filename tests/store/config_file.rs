//! Opening a store from `dictdb.toml`

use crate::common::*;
use std::time::Duration;

#[test]
fn config_toml_round_trip() {
    init_tracing();
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join(dictdb::CONFIG_FILE_NAME);

    let config = StoreConfig::at(dir.path().join("data"))
        .with_compression(true)
        .with_sort_keys(false)
        .with_lock_timeout(Duration::from_millis(2500))
        .with_stale_lock_threshold(Duration::from_secs(5));
    config.write_to_file(&path).unwrap();

    let loaded = StoreConfig::from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn relative_root_resolves_next_to_file() {
    init_tracing();
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join(dictdb::CONFIG_FILE_NAME);
    std::fs::write(&path, "storage_root = \"db\"\nfsync = false\n").unwrap();

    let db = DictDb::from_config_file(&path).unwrap();
    db.at("x").write(&json!(1)).unwrap();
    assert!(dir.path().join("db/x.json").is_file());
}

#[test]
fn invalid_config_file_fails_to_open() {
    init_tracing();
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join(dictdb::CONFIG_FILE_NAME);
    std::fs::write(&path, "indent = \"xx\"\n").unwrap();

    assert!(matches!(
        DictDb::from_config_file(&path),
        Err(Error::Config(_))
    ));
}

#[test]
fn indent_setting_is_applied() {
    let store = TestStore::with_config(|c| c.with_indent("  "));
    store.db.at("i").write(&json!({"a": 1})).unwrap();
    let text = std::fs::read_to_string(store.json_path("i")).unwrap();
    assert_eq!(text, "{\n  \"a\": 1\n}");
}
