//! Held locks
//!
//! A [`LockGuard`] owns one `has` record. Dropping it deletes the record,
//! which releases the lock on every exit path including panics.

use crate::record::{LockRecord, Mode};
use dictdb_core::{Error, Result};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

/// A record file this process created and must remove.
#[derive(Debug)]
pub(crate) struct RecordFile {
    path: PathBuf,
    record: LockRecord,
    removed: bool,
}

impl RecordFile {
    pub(crate) fn new(path: PathBuf, record: LockRecord) -> Self {
        RecordFile {
            path,
            record,
            removed: false,
        }
    }

    pub(crate) fn record(&self) -> &LockRecord {
        &self.record
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the record so its modification time is current.
    ///
    /// Returns `false` if the record has vanished, i.e. another participant
    /// reclaimed it as stale.
    pub(crate) fn touch(&self) -> Result<bool> {
        let mut file = match OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(Error::io(format!("refreshing {}", self.path.display()), e)),
        };
        file.write_all(describe_holder(&self.record).as_bytes())
            .map_err(|e| Error::io(format!("refreshing {}", self.path.display()), e))?;
        Ok(true)
    }

    pub(crate) fn remove(&mut self) -> Result<()> {
        if self.removed {
            return Ok(());
        }
        self.removed = true;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(format!("removing {}", self.path.display()), e)),
        }
    }
}

impl Drop for RecordFile {
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            warn!(
                target: "dictdb::lock",
                path = %self.path.display(),
                error = %e,
                "failed to remove lock record"
            );
        }
    }
}

/// Diagnostic body written into every record.
pub(crate) fn describe_holder(record: &LockRecord) -> String {
    let thread = std::thread::current();
    format!(
        "pid={}\nthread={}\nmode={}\nrefreshed={}\n",
        std::process::id(),
        thread.name().unwrap_or("<unnamed>"),
        record.mode,
        chrono::Utc::now().to_rfc3339()
    )
}

/// A granted read or write lock on one database name.
///
/// The lock is released when the guard is dropped or [`LockGuard::release`]
/// is called, whichever comes first.
#[derive(Debug)]
pub struct LockGuard {
    file: RecordFile,
    name: String,
    acquired_at: Instant,
}

impl LockGuard {
    pub(crate) fn new(file: RecordFile, name: String) -> Self {
        LockGuard {
            file,
            name,
            acquired_at: Instant::now(),
        }
    }

    /// Database name this guard locks
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared or exclusive
    pub fn mode(&self) -> Mode {
        self.file.record().mode
    }

    /// True for an exclusive lock
    pub fn is_write(&self) -> bool {
        self.mode() == Mode::Write
    }

    /// The on-disk record backing this guard
    pub fn record_path(&self) -> &Path {
        self.file.path()
    }

    /// Time since the lock was granted
    pub fn held_for(&self) -> std::time::Duration {
        self.acquired_at.elapsed()
    }

    /// Mark the lock as live so other participants do not reclaim it.
    ///
    /// Long-running holders call this more often than the stale threshold.
    /// Returns `false` if the record was already reclaimed; the caller no
    /// longer holds the lock in that case.
    pub fn refresh(&self) -> Result<bool> {
        let alive = self.file.touch()?;
        if !alive {
            warn!(
                target: "dictdb::lock",
                name = %self.name,
                mode = %self.mode(),
                "lock record was reclaimed while held"
            );
        }
        Ok(alive)
    }

    /// Release the lock now. Calling it again is a no-op.
    pub fn release(&mut self) -> Result<()> {
        if !self.file.removed {
            debug!(
                target: "dictdb::lock",
                name = %self.name,
                mode = %self.mode(),
                held_us = self.held_for().as_micros() as u64,
                "lock released"
            );
        }
        self.file.remove()
    }
}
