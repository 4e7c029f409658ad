//! Process-wide registry of open sessions
//!
//! A thread holding a session owns the write lock for that name. Any further
//! lock request for the same name from the same thread would wait on itself
//! until it timed out, so such requests are refused up front with
//! [`Error::ReentrantSession`].

use dictdb_core::{DbName, Error, Result};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::thread::ThreadId;
use tracing::debug;

type SessionKey = (ThreadId, PathBuf, String);

// Uses parking_lot::Mutex so a panicking session cannot poison the registry.

/// Global registry of open sessions (thread, storage root, name)
static OPEN_SESSIONS: Lazy<Mutex<HashSet<SessionKey>>> = Lazy::new(|| Mutex::new(HashSet::new()));

fn key(root: &Path, name: &DbName) -> SessionKey {
    (
        std::thread::current().id(),
        root.to_path_buf(),
        name.as_str().to_string(),
    )
}

/// Registration of one open session; unregisters on drop.
#[derive(Debug)]
pub(crate) struct SessionToken {
    key: SessionKey,
}

impl SessionToken {
    /// Register a session for `name` on the current thread.
    pub(crate) fn register(root: &Path, name: &DbName) -> Result<Self> {
        let key = key(root, name);
        if !OPEN_SESSIONS.lock().insert(key.clone()) {
            return Err(Error::ReentrantSession {
                name: name.to_string(),
            });
        }
        Ok(SessionToken { key })
    }
}

impl Drop for SessionToken {
    fn drop(&mut self) {
        OPEN_SESSIONS.lock().remove(&self.key);
        debug!(target: "dictdb::session", name = %self.key.2, "session closed");
    }
}

/// Fail if the current thread has a session open on `name`.
pub(crate) fn ensure_no_session(root: &Path, name: &DbName) -> Result<()> {
    if OPEN_SESSIONS.lock().contains(&key(root, name)) {
        return Err(Error::ReentrantSession {
            name: name.to_string(),
        });
    }
    Ok(())
}
