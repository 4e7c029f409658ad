//! create / read / write / delete / exists

use crate::common::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    name: String,
    age: u32,
    #[serde(default)]
    tags: Vec<String>,
}

#[test]
fn read_missing_returns_none() {
    let store = TestStore::new();
    assert_eq!(store.db.at("nobody").read().unwrap(), None);
    assert!(!store.db.at("nobody").exists().unwrap());
}

#[test]
fn create_twice_without_overwrite_fails() {
    let store = TestStore::new();
    let users = store.db.at("users");

    users.create(&json!({"a": 1}), false).unwrap();
    let err = users.create(&json!({"a": 2}), false).unwrap_err();
    assert!(matches!(err, Error::AlreadyExists { ref name } if name == "users"));
    assert_eq!(users.read().unwrap(), Some(json!({"a": 1})));

    users.create(&json!({"a": 3}), true).unwrap();
    users.create(&json!({"a": 4}), true).unwrap();
    assert_eq!(users.read().unwrap(), Some(json!({"a": 4})));
}

#[test]
fn nested_names_create_directories() {
    let store = TestStore::new();
    store.db.at("nested/file/creation").create_empty(false).unwrap();

    assert!(store.json_path("nested/file/creation").is_file());
    assert_eq!(
        store.db.at("nested/file/creation").read().unwrap(),
        Some(json!({}))
    );
}

#[test]
fn typed_round_trip() {
    let store = TestStore::new();
    let ada = User {
        name: "Ada".to_string(),
        age: 36,
        tags: vec!["math".to_string()],
    };

    store.db.at("users/ada").write(&ada).unwrap();
    assert_eq!(store.db.at("users/ada").read_as::<User>().unwrap(), Some(ada));
}

#[test]
fn read_as_wrong_shape_is_type_mismatch() {
    let store = TestStore::new();
    store.db.at("users/x").write(&json!(["not", "a", "user"])).unwrap();
    assert!(matches!(
        store.db.at("users/x").read_as::<User>(),
        Err(Error::TypeMismatch { .. })
    ));
}

#[test]
fn read_key_extracts_top_level_value() {
    let store = TestStore::new();
    let doc = store.db.at("settings");
    doc.write(&json!({"theme": "dark", "limits": {"max": 10}})).unwrap();

    assert_eq!(doc.read_key("theme").unwrap(), Some(json!("dark")));
    assert_eq!(doc.read_key("limits").unwrap(), Some(json!({"max": 10})));
    assert_eq!(doc.read_key("missing").unwrap(), None);
}

#[test]
fn read_key_on_odd_documents() {
    let store = TestStore::new();
    store.db.at("list").write(&json!([{"theme": "dark"}])).unwrap();
    assert_eq!(store.db.at("list").read_key("theme").unwrap(), None);
    assert_eq!(store.db.at("absent").read_key("theme").unwrap(), None);

    // Damage after the requested key is still reported
    std::fs::write(store.json_path("torn"), br#"{"theme": "dark", "rest": [1, "#).unwrap();
    let err = store.db.at("torn").read_key("theme").unwrap_err();
    assert!(matches!(err, Error::CorruptData { ref name, .. } if name == "torn"), "{:?}", err);
}

#[test]
fn delete_removes_and_is_idempotent() {
    let store = TestStore::new();
    let doc = store.db.at("temp");
    doc.write(&json!(1)).unwrap();
    assert!(doc.exists().unwrap());

    doc.delete().unwrap();
    assert!(!doc.exists().unwrap());
    assert!(!store.json_path("temp").exists());

    // Deleting nothing is fine
    doc.delete().unwrap();
}

#[test]
fn invalid_names_are_rejected() {
    let store = TestStore::new();
    for bad in ["", "/abs", "a//b", "../escape", "a/./b", ".ddb/x", "a\\b"] {
        let err = store.db.at(bad).write(&json!(1)).unwrap_err();
        assert!(
            matches!(err, Error::InvalidName { .. }),
            "{:?} gave {:?}",
            bad,
            err
        );
    }
}

#[test]
fn names_with_dots_are_plain_files() {
    let store = TestStore::new();
    store.db.at("v1.2").write(&json!("x")).unwrap();
    assert!(store.json_path("v1.2").is_file());
    assert_eq!(store.db.at("v1.2").read().unwrap(), Some(json!("x")));
}

#[test]
fn no_lock_records_left_behind() {
    let store = TestStore::new();
    let doc = store.db.at("clean");
    doc.create(&json!({}), false).unwrap();
    doc.read().unwrap();
    doc.write(&json!({"a": 1})).unwrap();
    let _ = doc.create(&json!({}), false);
    doc.delete().unwrap();
    assert_eq!(store.lock_record_count(), 0);
}

#[test]
fn no_temp_files_left_behind() {
    let store = TestStore::new();
    for i in 0..5 {
        store.db.at("churn").write(&json!({"i": i})).unwrap();
    }
    let leftovers: Vec<_> = std::fs::read_dir(store.root())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "{:?}", leftovers);
}

#[test]
fn handles_on_same_root_see_each_other() {
    let store = TestStore::new();
    let other = store.reopen();

    store.db.at("shared").write(&json!({"from": "first"})).unwrap();
    assert_eq!(
        other.at("shared").read_key("from").unwrap(),
        Some(json!("first"))
    );
}

#[test]
fn long_nested_names_work() {
    let store = TestStore::new();
    let segment = "s".repeat(70);
    let long = format!("{0}/{0}/{0}", segment);
    let doc = store.db.at(long.clone());

    assert_eq!(doc.read().unwrap(), None);
    assert!(!doc.exists().unwrap());

    doc.write(&json!({"deep": true})).unwrap();
    assert_eq!(doc.read().unwrap(), Some(json!({"deep": true})));
    assert!(store.json_path(&long).is_file());

    doc.with_session::<Value, _, Error, _>(|s| {
        s["deep"] = json!(false);
        s.write()
    })
    .unwrap();
    assert_eq!(doc.read_key("deep").unwrap(), Some(json!(false)));

    doc.delete().unwrap();
    assert!(!doc.exists().unwrap());
    assert_eq!(store.lock_record_count(), 0);
}

#[test]
fn overlong_segment_is_an_invalid_name() {
    let store = TestStore::new();
    let err = store.db.at(format!("a/{}", "s".repeat(300))).read().unwrap_err();
    assert!(matches!(err, Error::InvalidName { .. }), "{:?}", err);
}
