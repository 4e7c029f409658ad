//! Lock timeouts, shared readers and stale-lock recovery

use crate::common::*;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn held_write_lock_times_out_reader() {
    let store = TestStore::new();
    store.db.at("doc").write(&json!(1)).unwrap();

    let _session = store.db.at("doc").session::<Value>().unwrap();

    let config = store.db.config().with_lock_timeout(Duration::from_millis(150));
    let waited = thread::spawn(move || {
        let db = DictDb::open(config).unwrap();
        let started = Instant::now();
        let err = db.at("doc").read().unwrap_err();
        (err, started.elapsed())
    })
    .join()
    .unwrap();

    let (err, elapsed) = waited;
    assert!(err.is_retryable());
    match err {
        Error::LockTimeout { name, waited } => {
            assert_eq!(name, "doc");
            assert!(waited >= Duration::from_millis(150));
        }
        other => panic!("expected LockTimeout, got {:?}", other),
    }
    assert!(elapsed >= Duration::from_millis(150));
}

#[test]
fn readers_do_not_block_each_other() {
    let store = TestStore::new();
    store.db.at("shared").write(&json!({"v": 1})).unwrap();

    let target = name("shared");
    let locks = store.db.database().locks();
    let _r1 = locks.acquire_read(&target).unwrap();
    let _r2 = locks.acquire_read(&target).unwrap();

    // A reader with a tiny timeout still gets through
    let quick = store.db.config().with_lock_timeout(Duration::from_millis(100));
    let value = thread::spawn(move || DictDb::open(quick).unwrap().at("shared").read())
        .join()
        .unwrap()
        .unwrap();
    assert_eq!(value, Some(json!({"v": 1})));

    // ...while a writer cannot
    let quick = store.db.config().with_lock_timeout(Duration::from_millis(100));
    let err = thread::spawn(move || DictDb::open(quick).unwrap().at("shared").write(&json!(2)))
        .join()
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, Error::LockTimeout { .. }));
}

#[test]
fn stale_lock_from_crashed_writer_is_reclaimed() {
    let store = TestStore::with_config(|c| {
        c.with_stale_lock_threshold(Duration::from_millis(200))
            .with_lock_timeout(Duration::from_secs(10))
    });
    store.db.at("wedged").write(&json!({"ok": true})).unwrap();

    // Leave a `has.write` record behind as if its process had died
    std::fs::create_dir_all(store.lock_dir()).unwrap();
    let orphan = store
        .lock_dir()
        .join("wedged.999999-deadbeef.1.has.write.lock");
    std::fs::write(&orphan, "pid=999999\n").unwrap();
    thread::sleep(Duration::from_millis(300));

    assert_eq!(store.db.at("wedged").read_key("ok").unwrap(), Some(json!(true)));
    assert!(!orphan.exists());
    assert_eq!(store.lock_record_count(), 0);
}

#[test]
fn fresh_foreign_lock_is_respected() {
    let store = TestStore::with_lock_timeout(Duration::from_millis(150));
    store.db.at("owned").write(&json!(1)).unwrap();

    std::fs::create_dir_all(store.lock_dir()).unwrap();
    let live = store.lock_dir().join("owned.424242-cafe.1.has.write.lock");
    std::fs::write(&live, "pid=424242\n").unwrap();

    assert!(matches!(
        store.db.at("owned").read(),
        Err(Error::LockTimeout { .. })
    ));
    assert!(live.exists());
}

#[test]
fn abandoned_temp_file_does_not_affect_readers() {
    let store = TestStore::new();
    store.db.at("doc").write(&json!({"v": "committed"})).unwrap();

    // A writer that died between staging and rename
    std::fs::write(store.root().join(".doc.json.0123abcd.tmp"), b"{\"v\": \"half").unwrap();

    assert_eq!(store.db.at("doc").read_key("v").unwrap(), Some(json!("committed")));
    assert_eq!(store.db.at("*").read().unwrap().unwrap().as_object().unwrap().len(), 1);
}

#[test]
fn lock_records_are_flat_files_in_lock_dir() {
    let store = TestStore::new();
    let target = name("deeply/nested/doc");
    let guard = store.locks().acquire_write(&target).unwrap();

    let path = guard.record_path().to_path_buf();
    assert_eq!(path.parent().unwrap(), store.lock_dir());
    assert!(path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("deeply%2Fnested%2Fdoc."));
    drop(guard);
    assert!(!path.exists());
}

#[test]
fn long_names_get_short_lock_records() {
    let store = TestStore::new();
    let segment = "s".repeat(70);
    let target = name(&format!("{0}/{0}/{0}", segment));
    let locks = store.locks();

    let guard = locks.acquire_write(&target).unwrap();
    let file_name = guard.record_path().file_name().unwrap().to_string_lossy().into_owned();
    assert!(file_name.starts_with('~'), "{}", file_name);
    assert!(file_name.len() < 255);

    let holders = locks.holders(&target).unwrap();
    assert_eq!(holders.len(), 1);
    assert_eq!(holders[0].mode, LockMode::Write);
    assert!(locks.holders(&name("other")).unwrap().is_empty());

    drop(guard);
    assert!(locks.records(&target).unwrap().is_empty());
}
