//! Atomic file replacement
//!
//! Documents are never written in place. The full encoded buffer goes to a
//! hidden temporary sibling first, is optionally fsynced, and is then renamed
//! over the target. A reader therefore sees either the old or the new file,
//! never a prefix of the new one, even if the writer crashes mid-write.

use dictdb_core::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Suffix of temporary files. Wildcard expansion skips them.
pub const TEMP_SUFFIX: &str = ".tmp";

/// A fully written temporary file waiting to be renamed over its target.
///
/// Dropping a `StagedFile` without calling [`StagedFile::commit`] removes
/// the temporary file.
#[derive(Debug)]
pub struct StagedFile {
    temp: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedFile {
    /// Write `bytes` to a temporary sibling of `target`.
    pub fn stage(target: &Path, bytes: &[u8], fsync: bool) -> Result<Self> {
        let temp = temp_path_for(target);
        let staged = StagedFile {
            temp,
            target: target.to_path_buf(),
            committed: false,
        };

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staged.temp)
            .map_err(|e| Error::io(format!("creating {}", staged.temp.display()), e))?;
        file.write_all(bytes)
            .map_err(|e| Error::io(format!("writing {}", staged.temp.display()), e))?;
        if fsync {
            file.sync_all()
                .map_err(|e| Error::io(format!("syncing {}", staged.temp.display()), e))?;
        }
        Ok(staged)
    }

    /// Temporary path holding the staged bytes.
    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    /// Atomically move the staged bytes over the target.
    pub fn commit(mut self, fsync: bool) -> Result<()> {
        std::fs::rename(&self.temp, &self.target).map_err(|e| {
            Error::io(
                format!("renaming {} to {}", self.temp.display(), self.target.display()),
                e,
            )
        })?;
        self.committed = true;

        if fsync {
            sync_parent_dir(&self.target);
        }
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = std::fs::remove_file(&self.temp) {
                if e.kind() != ErrorKind::NotFound {
                    warn!(
                        target: "dictdb::engine",
                        path = %self.temp.display(),
                        error = %e,
                        "failed to remove abandoned temp file"
                    );
                }
            }
        }
    }
}

/// Read a whole file; `None` if it does not exist.
pub fn read_file(path: &Path) -> Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(format!("reading {}", path.display()), e)),
    }
}

/// Remove a file; returns whether it existed.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(format!("removing {}", path.display()), e)),
    }
}

fn temp_path_for(target: &Path) -> PathBuf {
    let file_name = target
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(
        ".{}.{}{}",
        file_name,
        uuid::Uuid::new_v4().simple(),
        TEMP_SUFFIX
    ))
}

// Directory fsync is best effort; not every platform allows opening a
// directory for syncing.
fn sync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}
