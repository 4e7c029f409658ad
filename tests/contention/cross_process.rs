//! Separate OS processes incrementing one counter.
//!
//! The parent re-runs this test binary with `--ignored` so that only
//! `counter_child_worker` executes in each child.

use crate::common::*;
use std::process::Command;

const ROOT_VAR: &str = "DICTDB_TEST_CHILD_ROOT";
const ITERS_VAR: &str = "DICTDB_TEST_CHILD_ITERS";

#[test]
fn processes_increment_shared_counter() {
    let store = TestStore::new();
    store.db.at("counter").write(&json!({"value": 0})).unwrap();

    let exe = std::env::current_exe().unwrap();
    let num_children = 4;
    let iterations = 20;

    let children: Vec<_> = (0..num_children)
        .map(|_| {
            Command::new(&exe)
                .args([
                    "--ignored",
                    "--exact",
                    "cross_process::counter_child_worker",
                    "--test-threads=1",
                ])
                .env(ROOT_VAR, store.root())
                .env(ITERS_VAR, iterations.to_string())
                .spawn()
                .unwrap()
        })
        .collect();

    for mut child in children {
        assert!(child.wait().unwrap().success());
    }

    assert_eq!(
        store.db.at("counter").read_key("value").unwrap(),
        Some(json!(num_children * iterations))
    );
    assert_eq!(store.lock_record_count(), 0);
}

/// Child side of `processes_increment_shared_counter`; a no-op when run
/// directly.
#[test]
#[ignore]
fn counter_child_worker() {
    let (Ok(root), Ok(iters)) = (std::env::var(ROOT_VAR), std::env::var(ITERS_VAR)) else {
        return;
    };
    let iters: usize = iters.parse().unwrap();
    let db = DictDb::open(StoreConfig::at(root).with_fsync(false)).unwrap();

    for _ in 0..iters {
        db.at("counter")
            .with_session::<Value, _, Error, _>(|c| {
                let next = c["value"].as_i64().unwrap_or(0) + 1;
                c["value"] = json!(next);
                c.write()
            })
            .unwrap();
    }
}
