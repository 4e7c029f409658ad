//! Scoped read-modify-write sessions
//!
//! A [`Session`] holds the write lock for one name from the moment it is
//! opened until it is dropped. In between the caller mutates a decoded copy
//! of the document through `Deref`/`DerefMut` and persists it with
//! [`Session::write`]. Nothing is written implicitly: a session dropped
//! without `write()` (early `?`, panic, or a plain change of mind) leaves
//! the stored document untouched.
//!
//! ```text
//! db.session::<T>(name)
//!   register (thread, root, name)   -> ReentrantSession if already open
//!   acquire_write(name)
//!   load + decode (empty mapping if absent) -> T
//!   ... caller mutates, calls write() zero or more times ...
//! drop
//!   release write lock, unregister
//! ```

use crate::database::{from_value, Database, SessionToken};
use dictdb_concurrency::LockGuard;
use dictdb_core::{DbName, Error, Map, Result, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::ops::{Deref, DerefMut};
use tracing::debug;

/// An open read-modify-write session on one database name.
pub struct Session<'a, T> {
    value: T,
    name: DbName,
    db: &'a Database,
    writes: usize,
    // Dropped in declaration order: the lock is released before the
    // session is unregistered.
    guard: LockGuard,
    _token: SessionToken,
}

impl Database {
    /// Open a session on `name`, decoding the stored document into `T`.
    ///
    /// A missing document starts out as an empty mapping, so `T` must be
    /// able to deserialize from `{}` (e.g. a map, or a struct whose fields
    /// all have defaults) for new names.
    pub fn session<T>(&self, name: &DbName) -> Result<Session<'_, T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let token = SessionToken::register(self.root(), name)?;
        let guard = self.acquire_write(name)?;

        let stored = self
            .load_locked(name)?
            .unwrap_or_else(|| Value::Object(Map::new()));
        let value = from_value(name, stored)?;

        debug!(target: "dictdb::session", name = %name, "session opened");
        Ok(Session {
            value,
            name: name.clone(),
            db: self,
            writes: 0,
            guard,
            _token: token,
        })
    }

    /// Run `f` inside a session on `name`.
    ///
    /// The lock is released before the closure's result, success or error,
    /// is handed back unchanged.
    pub fn with_session<T, R, E, F>(&self, name: &DbName, f: F) -> std::result::Result<R, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<Error>,
        F: FnOnce(&mut Session<'_, T>) -> std::result::Result<R, E>,
    {
        let mut session = self.session::<T>(name)?;
        let out = f(&mut session);
        drop(session);
        out
    }
}

impl<'a, T: Serialize> Session<'a, T> {
    /// Database name of this session
    pub fn name(&self) -> &DbName {
        &self.name
    }

    /// Number of successful `write()` calls so far
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Persist the current value.
    ///
    /// May be called several times; each call replaces the stored document.
    pub fn write(&mut self) -> Result<()> {
        let (bytes, variant, fsync) = self.db.encode(&self.value)?;
        if !self.guard.refresh()? {
            return Err(Error::LockLost {
                name: self.name.to_string(),
            });
        }
        self.db.store_locked(&self.name, &bytes, variant, fsync)?;
        self.writes += 1;
        debug!(
            target: "dictdb::session",
            name = %self.name,
            writes = self.writes,
            "session committed"
        );
        Ok(())
    }

    /// Close the session and return the in-memory value.
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for Session<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Session<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Session<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("writes", &self.writes)
            .finish()
    }
}
