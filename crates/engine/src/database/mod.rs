//! Database struct and the locked storage operations
//!
//! A [`Database`] is a handle on one storage root. It holds no document
//! state in memory: every operation resolves the name, takes the matching
//! lock, touches the file and releases the lock before returning. Any number
//! of handles, in any number of processes, may share a root.
//!
//! ## Operation protocol
//!
//! ```text
//! read:   acquire_read  -> resolve -> read file -> decode -> release
//! write:  encode        -> acquire_write -> resolve -> stage temp (+fsync)
//!         -> rename over target -> remove other variant -> release
//! delete: acquire_write -> resolve -> remove every variant -> release
//! ```
//!
//! Encoding happens before the lock is taken, so a value that cannot be
//! stored fails with [`Error::UnsupportedType`] without touching disk.

pub mod config;
mod registry;

pub use config::{StoreConfig, CONFIG_FILE_NAME, DEFAULT_STORAGE_ROOT};

pub(crate) use registry::{ensure_no_session, SessionToken};

use dictdb_concurrency::{LockGuard, LockManager};
use dictdb_core::{DbName, Error, Map, Result, Value};
use dictdb_durability::{
    decode_document, decode_key, encode_document, read_file, remove_if_exists, StagedFile, StoragePaths,
    Variant,
};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Handle on one storage root.
#[derive(Debug)]
pub struct Database {
    paths: StoragePaths,
    config: RwLock<StoreConfig>,
}

impl Database {
    /// Open (and create if needed) the store described by `config`.
    pub fn open(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let paths = StoragePaths::from_root(&config.storage_root);
        paths.create_directories()?;

        // Canonical roots make session registration independent of how the
        // root was spelled.
        let root = std::fs::canonicalize(paths.root()).unwrap_or_else(|_| paths.root().to_path_buf());
        let paths = StoragePaths::from_root(&root);
        let mut config = config;
        config.storage_root = root;

        info!(
            target: "dictdb::engine",
            root = %paths.root().display(),
            compression = config.use_compression,
            "opened store"
        );
        Ok(Database {
            paths,
            config: RwLock::new(config),
        })
    }

    /// Open a store at `root` with default settings.
    pub fn open_at(root: impl Into<PathBuf>) -> Result<Self> {
        Self::open(StoreConfig::at(root))
    }

    /// Storage root (canonicalized)
    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    /// Path layout of this store
    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> StoreConfig {
        self.config.read().clone()
    }

    /// Change settings of an open store.
    ///
    /// The storage root cannot be changed; open a new `Database` instead.
    pub fn update_config(&self, update: impl FnOnce(&mut StoreConfig)) -> Result<()> {
        let mut guard = self.config.write();
        let mut next = guard.clone();
        update(&mut next);
        if next.storage_root != guard.storage_root {
            return Err(Error::Config(
                "storage_root cannot be changed on an open store".to_string(),
            ));
        }
        next.validate()?;
        *guard = next;
        Ok(())
    }

    /// Lock manager for the current configuration.
    pub fn locks(&self) -> LockManager {
        LockManager::new(self.paths.lock_dir(), self.config.read().lock_config())
    }

    /// Whether `name` is stored in either variant.
    pub fn exists(&self, name: &DbName) -> Result<bool> {
        ensure_no_session(self.root(), name)?;
        let _guard = self.locks().acquire_read(name)?;
        Ok(self.paths.resolve(name).into_single(name)?.is_some())
    }

    /// Read the whole document; `None` if it does not exist.
    pub fn read(&self, name: &DbName) -> Result<Option<Value>> {
        ensure_no_session(self.root(), name)?;
        let _guard = self.locks().acquire_read(name)?;
        self.load_locked(name)
    }

    /// Read the whole document into `T`.
    pub fn read_as<T: DeserializeOwned>(&self, name: &DbName) -> Result<Option<T>> {
        self.read(name)?
            .map(|value| from_value(name, value))
            .transpose()
    }

    /// Read one top-level key of a mapping document.
    ///
    /// `None` if the document is missing, is not a mapping, or lacks `key`.
    pub fn read_key(&self, name: &DbName, key: &str) -> Result<Option<Value>> {
        ensure_no_session(self.root(), name)?;
        let _guard = self.locks().acquire_read(name)?;
        let Some((variant, path)) = self.paths.resolve(name).into_single(name)? else {
            return Ok(None);
        };
        match read_file(&path)? {
            Some(bytes) => decode_key(name.as_str(), &bytes, variant, key),
            None => Ok(None),
        }
    }

    /// Create `name` holding `value`.
    ///
    /// Fails with [`Error::AlreadyExists`] if it exists and `overwrite` is
    /// false.
    pub fn create<T: Serialize + ?Sized>(
        &self,
        name: &DbName,
        value: &T,
        overwrite: bool,
    ) -> Result<()> {
        let (bytes, variant, fsync) = self.encode(value)?;

        ensure_no_session(self.root(), name)?;
        let _guard = self.locks().acquire_write(name)?;
        if !overwrite && self.paths.resolve(name).exists() {
            return Err(Error::AlreadyExists {
                name: name.to_string(),
            });
        }
        self.store_locked(name, &bytes, variant, fsync)
    }

    /// Create `name` holding an empty mapping.
    pub fn create_empty(&self, name: &DbName, overwrite: bool) -> Result<()> {
        self.create(name, &Value::Object(Map::new()), overwrite)
    }

    /// Replace the document stored under `name`, creating it if needed.
    pub fn write<T: Serialize + ?Sized>(&self, name: &DbName, value: &T) -> Result<()> {
        let (bytes, variant, fsync) = self.encode(value)?;

        ensure_no_session(self.root(), name)?;
        let _guard = self.locks().acquire_write(name)?;
        self.store_locked(name, &bytes, variant, fsync)
    }

    /// Remove every stored variant of `name`; a no-op if none exists.
    ///
    /// Returns whether anything was removed.
    pub fn delete(&self, name: &DbName) -> Result<bool> {
        ensure_no_session(self.root(), name)?;
        let _guard = self.locks().acquire_write(name)?;

        let resolved = self.paths.resolve(name);
        let mut removed = false;
        for path in resolved.existing_paths() {
            removed |= remove_if_exists(path)?;
        }
        debug!(target: "dictdb::engine", name = %name, removed, "deleted");
        Ok(removed)
    }

    /// Decode the stored document. Caller holds a read or write guard.
    pub(crate) fn load_locked(&self, name: &DbName) -> Result<Option<Value>> {
        let Some((variant, path)) = self.paths.resolve(name).into_single(name)? else {
            return Ok(None);
        };
        match read_file(&path)? {
            Some(bytes) => decode_document(name.as_str(), &bytes, variant).map(Some),
            None => Ok(None),
        }
    }

    /// Persist `bytes` as `variant`. Caller holds the write guard.
    pub(crate) fn store_locked(
        &self,
        name: &DbName,
        bytes: &[u8],
        variant: Variant,
        fsync: bool,
    ) -> Result<()> {
        let existing = self.paths.resolve(name).into_single(name)?;
        self.paths.create_parent_dirs(name)?;

        let target = self.paths.path_for(name, variant);
        StagedFile::stage(&target, bytes, fsync)?.commit(fsync)?;

        if let Some((old_variant, old_path)) = existing {
            if old_variant != variant {
                if let Err(e) = remove_if_exists(&old_path) {
                    warn!(
                        target: "dictdb::engine",
                        name = %name,
                        stale = %old_path.display(),
                        error = %e,
                        "both variants now on disk; delete the name or remove the stale file"
                    );
                    return Err(e);
                }
                warn!(
                    target: "dictdb::engine",
                    name = %name,
                    from = old_variant.extension(),
                    to = variant.extension(),
                    "switched storage variant"
                );
            }
        }
        debug!(
            target: "dictdb::engine",
            name = %name,
            bytes = bytes.len(),
            variant = variant.extension(),
            "wrote"
        );
        Ok(())
    }

    /// Encode with the current configuration.
    pub(crate) fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<(Vec<u8>, Variant, bool)> {
        let config = self.config();
        let bytes = encode_document(value, &config.encode_options())?;
        Ok((bytes, config.variant(), config.fsync))
    }

    /// Acquire the write guard for a session.
    pub(crate) fn acquire_write(&self, name: &DbName) -> Result<LockGuard> {
        self.locks().acquire_write(name)
    }
}

/// Deserialize a stored value into `T`.
pub(crate) fn from_value<T: DeserializeOwned>(name: &DbName, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::TypeMismatch {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
