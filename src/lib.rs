//! dictdb - embedded file-per-document JSON store
//!
//! Every database is one JSON document stored as its own file (`.json`, or
//! zlib-compressed `.ddb`) below a storage root. Access is coordinated by
//! lock files, so any mix of threads and processes may share a root.
//!
//! # Quick Start
//!
//! ```no_run
//! use dictdb::prelude::*;
//! use serde_json::json;
//!
//! # fn main() -> dictdb::Result<()> {
//! let db = DictDb::open_at("./ddb_storage")?;
//!
//! db.at("users/ada").create(&json!({"visits": 0}), false)?;
//!
//! // Read-modify-write under the write lock
//! db.at("users/ada").with_session::<Value, _, Error, _>(|user| {
//!     let visits = user["visits"].as_i64().unwrap_or(0);
//!     user["visits"] = json!(visits + 1);
//!     user.write()
//! })?;
//!
//! let _everyone = db.at("users/*").read()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `dictdb-core`: error taxonomy, names and wildcard patterns
//! - `dictdb-durability`: codecs, document encoding, atomic file replacement
//! - `dictdb-concurrency`: the cross-process reader/writer lock protocol
//! - `dictdb-engine`: [`Database`], wildcard reads, [`Session`], config
//!
//! This crate adds the [`DictDb`] handle and the [`Selection`] API on top.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod prelude;
mod selection;

pub use dictdb_core::{DbName, Error, Map, NamePattern, Result, Target, Value, WILDCARD};
pub use dictdb_engine::{Database, Session, StoreConfig, CONFIG_FILE_NAME};

/// Lock inspection, via [`Database::locks`]
pub use dictdb_concurrency::{LockGuard, LockManager, LockRecord, Mode as LockMode};

/// Storage layout, via [`Database::paths`]
pub use dictdb_durability::{Resolved, StoragePaths, Variant};
pub use selection::Selection;

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Handle on a store. Cheap to clone; clones share one [`Database`].
#[derive(Debug, Clone)]
pub struct DictDb {
    db: Arc<Database>,
}

impl DictDb {
    /// Open the store described by `config`, creating its root if needed.
    pub fn open(config: StoreConfig) -> Result<Self> {
        Ok(DictDb {
            db: Arc::new(Database::open(config)?),
        })
    }

    /// Open a store at `root` with default settings.
    pub fn open_at(root: impl Into<PathBuf>) -> Result<Self> {
        Self::open(StoreConfig::at(root))
    }

    /// Open the store described by a `dictdb.toml` file.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(StoreConfig::from_file(path.as_ref())?)
    }

    /// Select a database name or wildcard pattern.
    ///
    /// The selector is validated when an operation runs, not here.
    pub fn at(&self, selector: impl Into<String>) -> Selection<'_> {
        Selection::new(&self.db, selector.into())
    }

    /// The underlying engine
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Storage root
    pub fn root(&self) -> &Path {
        self.db.root()
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> StoreConfig {
        self.db.config()
    }

    /// Change settings (compression, formatting, lock timings).
    pub fn update_config(&self, update: impl FnOnce(&mut StoreConfig)) -> Result<()> {
        self.db.update_config(update)
    }
}
