//! Many threads, one store

use crate::common::*;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Barrier};
use std::thread;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Counter {
    #[serde(default)]
    value: i64,
}

/// 8 threads x 25 increments through sessions; no update may be lost.
#[test]
fn concurrent_session_increments_are_serialized() {
    let store = TestStore::new();
    store.db.at("counter").write(&json!({"value": 5})).unwrap();

    let num_threads = 8;
    let per_thread = 25;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            // Each thread opens its own handle, as an independent component would
            let db = store.reopen();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..per_thread {
                    db.at("counter")
                        .with_session::<Counter, _, Error, _>(|c| {
                            c.value += 1;
                            c.write()
                        })
                        .unwrap();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    let final_value = store.db.at("counter").read_as::<Counter>().unwrap().unwrap();
    assert_eq!(final_value.value, 5 + (num_threads * per_thread) as i64);
    assert_eq!(store.lock_record_count(), 0);
}

/// Readers running alongside writers only ever see complete documents.
#[test]
fn readers_never_see_partial_documents() {
    let store = TestStore::new();
    let big: Vec<i64> = (0..2000).collect();
    store.db.at("big").write(&json!({"gen": 0, "data": big})).unwrap();

    let writer_db = store.reopen();
    let writer = thread::spawn(move || {
        for gen in 1..=20 {
            let data: Vec<i64> = (0..2000).map(|x| x * gen).collect();
            writer_db.at("big").write(&json!({"gen": gen, "data": data})).unwrap();
        }
    });

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let db = store.reopen();
            thread::spawn(move || {
                for _ in 0..30 {
                    let doc = db.at("big").read().unwrap().unwrap();
                    let gen = doc["gen"].as_i64().unwrap();
                    let data = doc["data"].as_array().unwrap();
                    assert_eq!(data.len(), 2000);
                    assert_eq!(data[1999].as_i64().unwrap(), 1999 * gen.max(1));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }
}

/// Different names never contend.
#[test]
fn independent_names_proceed_in_parallel() {
    let store = TestStore::with_lock_timeout(std::time::Duration::from_millis(500));

    let _held = store.db.at("busy").session::<Value>().unwrap();
    let db = store.reopen();
    thread::spawn(move || {
        for i in 0..10 {
            db.at(format!("free/{}", i)).write(&json!(i)).unwrap();
        }
    })
    .join()
    .unwrap();

    assert_eq!(store.db.at("free/*").read().unwrap().unwrap().as_object().unwrap().len(), 10);
}
