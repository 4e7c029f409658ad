//! Shared test utilities for all integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's
//! main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;
use tempfile::TempDir;

pub use dictdb::prelude::*;
pub use dictdb::{DbName, LockManager, LockMode, NamePattern, Resolved, Variant};
pub use serde_json::json;

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output through the test harness (`RUST_LOG` filters).
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// TestStore - temporary store wrapper
// ============================================================================

/// A store rooted in a fresh temporary directory.
pub struct TestStore {
    pub db: DictDb,
    pub dir: TempDir,
}

impl TestStore {
    /// Default settings, fsync off to keep the suite fast.
    pub fn new() -> Self {
        Self::with_config(|c| c)
    }

    /// Default settings adjusted by `f`.
    pub fn with_config(f: impl FnOnce(StoreConfig) -> StoreConfig) -> Self {
        init_tracing();
        let dir = TempDir::new().expect("tempdir");
        let config = f(StoreConfig::at(dir.path().join("store")).with_fsync(false));
        let db = DictDb::open(config).expect("open store");
        TestStore { db, dir }
    }

    /// Short lock timeout for tests that expect contention to fail.
    pub fn with_lock_timeout(timeout: Duration) -> Self {
        Self::with_config(|c| c.with_lock_timeout(timeout))
    }

    /// Storage root
    pub fn root(&self) -> &Path {
        self.db.root()
    }

    /// A second handle on the same root, as another component would open it.
    pub fn reopen(&self) -> DictDb {
        DictDb::open(self.db.config()).expect("reopen store")
    }

    /// Path of `name` stored uncompressed.
    pub fn json_path(&self, name: &str) -> PathBuf {
        self.root().join(format!("{}.json", name))
    }

    /// Path of `name` stored compressed.
    pub fn ddb_path(&self, name: &str) -> PathBuf {
        self.root().join(format!("{}.ddb", name))
    }

    /// Lock manager configured like the store
    pub fn locks(&self) -> LockManager {
        self.db.database().locks()
    }

    /// Which variant files exist for `name` right now.
    pub fn resolve(&self, name: &str) -> Resolved {
        self.db.database().paths().resolve(&DbName::new(name).expect("valid name"))
    }

    /// Lock directory
    pub fn lock_dir(&self) -> PathBuf {
        self.root().join(".ddb")
    }

    /// Number of lock records currently on disk.
    pub fn lock_record_count(&self) -> usize {
        match std::fs::read_dir(self.lock_dir()) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_name().to_string_lossy().ends_with(".lock"))
                .count(),
            Err(_) => 0,
        }
    }
}

/// Parse a concrete name.
pub fn name(s: &str) -> DbName {
    DbName::new(s).expect("valid name")
}
