//! Both variants on disk for one name

use crate::common::*;

fn store_with_both() -> TestStore {
    let store = TestStore::new();
    store.db.at("dup").write(&json!({"v": "json"})).unwrap();
    std::fs::write(store.ddb_path("dup"), b"not even zlib").unwrap();
    store
}

#[test]
fn read_write_exists_fail() {
    let store = store_with_both();
    let doc = store.db.at("dup");

    assert!(doc.read().unwrap_err().is_inconsistency());
    assert!(doc.exists().unwrap_err().is_inconsistency());
    assert!(doc.write(&json!(1)).unwrap_err().is_inconsistency());
    assert!(doc.session::<Value>().unwrap_err().is_inconsistency());

    // Nothing was repaired behind our back
    assert!(store.json_path("dup").is_file());
    assert!(store.ddb_path("dup").is_file());
}

#[test]
fn error_names_both_files() {
    let store = store_with_both();
    match store.db.at("dup").read().unwrap_err() {
        Error::StorageInconsistency { name, json, ddb } => {
            assert_eq!(name, "dup");
            assert!(json.ends_with("dup.json"));
            assert!(ddb.ends_with("dup.ddb"));
        }
        other => panic!("expected StorageInconsistency, got {:?}", other),
    }

    let message = store.db.at("dup").exists().unwrap_err().to_string();
    assert!(message.contains("delete the name"), "{}", message);
}

#[test]
fn delete_clears_both() {
    let store = store_with_both();
    store.db.at("dup").delete().unwrap();
    assert!(!store.json_path("dup").exists());
    assert!(!store.ddb_path("dup").exists());

    store.db.at("dup").write(&json!("fresh")).unwrap();
    assert_eq!(store.db.at("dup").read().unwrap(), Some(json!("fresh")));
}

#[test]
fn corrupt_file_is_reported() {
    let store = TestStore::new();
    std::fs::create_dir_all(store.root()).unwrap();
    std::fs::write(store.ddb_path("broken"), b"definitely not zlib").unwrap();
    assert!(matches!(
        store.db.at("broken").read(),
        Err(Error::CorruptData { .. })
    ));
}
