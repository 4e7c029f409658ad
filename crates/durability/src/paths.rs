//! Storage directory structure
//!
//! Every database is one file below the storage root; lock records live in
//! a reserved dot-directory next to them:
//!
//! ```text
//! storage_root/
//! ├── .ddb/                 # Lock records (see dictdb-concurrency)
//! ├── settings.json         # "settings", uncompressed
//! └── users/
//!     ├── 1.json            # "users/1"
//!     └── 2.ddb             # "users/2", compressed
//! ```

use crate::codec::Variant;
use dictdb_core::{DbName, Error, Result};
use std::path::{Path, PathBuf};

/// Name of the reserved lock directory below the storage root.
pub const LOCK_DIR_NAME: &str = ".ddb";

/// Which variant files exist for one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Neither variant exists
    None,
    /// Only the `.json` file exists
    Uncompressed(PathBuf),
    /// Only the `.ddb` file exists
    Compressed(PathBuf),
    /// Both exist: an inconsistency callers must surface
    Both {
        /// `.json` path
        json: PathBuf,
        /// `.ddb` path
        ddb: PathBuf,
    },
}

impl Resolved {
    /// Collapse to the single existing file, failing on [`Resolved::Both`].
    pub fn into_single(self, name: &DbName) -> Result<Option<(Variant, PathBuf)>> {
        match self {
            Resolved::None => Ok(None),
            Resolved::Uncompressed(p) => Ok(Some((Variant::Json, p))),
            Resolved::Compressed(p) => Ok(Some((Variant::Compressed, p))),
            Resolved::Both { json, ddb } => Err(Error::StorageInconsistency {
                name: name.to_string(),
                json,
                ddb,
            }),
        }
    }

    /// True unless neither variant exists.
    pub fn exists(&self) -> bool {
        !matches!(self, Resolved::None)
    }

    /// Every existing file, in `.json`, `.ddb` order.
    pub fn existing_paths(&self) -> Vec<&Path> {
        match self {
            Resolved::None => vec![],
            Resolved::Uncompressed(p) | Resolved::Compressed(p) => vec![p.as_path()],
            Resolved::Both { json, ddb } => vec![json.as_path(), ddb.as_path()],
        }
    }
}

/// Paths below one storage root.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl StoragePaths {
    /// Create paths from the storage root
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        StoragePaths {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the storage root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the lock record directory
    pub fn lock_dir(&self) -> PathBuf {
        self.root.join(LOCK_DIR_NAME)
    }

    /// Path of `name` stored as `variant`.
    pub fn path_for(&self, name: &DbName, variant: Variant) -> PathBuf {
        let mut path = self.root.join(name.relative_path());
        let file_name = format!(
            "{}.{}",
            path.file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default(),
            variant.extension()
        );
        path.set_file_name(file_name);
        path
    }

    /// Get the `.json` path of `name`
    pub fn json_path(&self, name: &DbName) -> PathBuf {
        self.path_for(name, Variant::Json)
    }

    /// Get the `.ddb` path of `name`
    pub fn ddb_path(&self, name: &DbName) -> PathBuf {
        self.path_for(name, Variant::Compressed)
    }

    /// Inspect which variants of `name` exist. Touches nothing.
    pub fn resolve(&self, name: &DbName) -> Resolved {
        let json = self.json_path(name);
        let ddb = self.ddb_path(name);
        match (json.is_file(), ddb.is_file()) {
            (false, false) => Resolved::None,
            (true, false) => Resolved::Uncompressed(json),
            (false, true) => Resolved::Compressed(ddb),
            (true, true) => Resolved::Both { json, ddb },
        }
    }

    /// Create the directories that will hold `name`.
    pub fn create_parent_dirs(&self, name: &DbName) -> Result<()> {
        let path = self.json_path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::io(format!("creating {}", parent.display()), e))?;
        }
        Ok(())
    }

    /// Create the root and lock directories
    pub fn create_directories(&self) -> Result<()> {
        for dir in [self.root.clone(), self.lock_dir()] {
            std::fs::create_dir_all(&dir)
                .map_err(|e| Error::io(format!("creating {}", dir.display()), e))?;
        }
        Ok(())
    }
}
