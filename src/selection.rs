//! `db.at(name)` selections
//!
//! A [`Selection`] is either one concrete name or a wildcard pattern. Reads
//! accept both; everything that mutates, holds a session, or extracts a
//! single key needs a concrete name and fails with
//! [`Error::InvalidQuery`] on a pattern before touching the filesystem.

use dictdb_core::{DbName, Error, Map, NamePattern, Result, Target, Value};
use dictdb_engine::{Database, Session};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// One or more databases selected by name or pattern.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    db: &'a Database,
    selector: String,
}

impl<'a> Selection<'a> {
    pub(crate) fn new(db: &'a Database, selector: String) -> Self {
        Selection { db, selector }
    }

    /// The selector as given
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Parse the selector.
    pub fn target(&self) -> Result<Target> {
        Target::parse(&self.selector)
    }

    fn name(&self, operation: &str) -> Result<DbName> {
        match self.target()? {
            Target::Name(name) => Ok(name),
            Target::Pattern(pattern) => Err(Error::invalid_query(format!(
                "{} needs a single database, \"{}\" is a wildcard pattern",
                operation, pattern
            ))),
        }
    }

    /// Whether the name exists, or for a pattern, whether anything matches.
    pub fn exists(&self) -> Result<bool> {
        match self.target()? {
            Target::Name(name) => self.db.exists(&name),
            Target::Pattern(pattern) => Ok(!self.db.expand(&pattern)?.is_empty()),
        }
    }

    /// Read the selected document.
    ///
    /// A pattern always yields a mapping from concrete name to document
    /// (possibly empty).
    pub fn read(&self) -> Result<Option<Value>> {
        match self.target()? {
            Target::Name(name) => self.db.read(&name),
            Target::Pattern(pattern) => Ok(Some(self.read_pattern(&pattern)?)),
        }
    }

    /// Read the selected document into `T`.
    ///
    /// For a pattern, `T` receives the name-to-document mapping, e.g.
    /// `BTreeMap<String, User>`.
    pub fn read_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match self.target()? {
            Target::Name(name) => self.db.read_as(&name),
            Target::Pattern(pattern) => {
                let value = self.read_pattern(&pattern)?;
                serde_json::from_value(value)
                    .map(Some)
                    .map_err(|e| Error::TypeMismatch {
                        name: pattern.to_string(),
                        reason: e.to_string(),
                    })
            }
        }
    }

    /// Read one top-level key of the selected document.
    pub fn read_key(&self, key: &str) -> Result<Option<Value>> {
        let name = self.name("reading a single key")?;
        self.db.read_key(&name, key)
    }

    /// Create the document; see [`Database::create`].
    pub fn create<T: Serialize + ?Sized>(&self, value: &T, overwrite: bool) -> Result<()> {
        let name = self.name("create")?;
        self.db.create(&name, value, overwrite)
    }

    /// Create the document as an empty mapping.
    pub fn create_empty(&self, overwrite: bool) -> Result<()> {
        let name = self.name("create")?;
        self.db.create_empty(&name, overwrite)
    }

    /// Replace the document.
    pub fn write<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let name = self.name("write")?;
        self.db.write(&name, value)
    }

    /// Delete the document; a no-op if it does not exist.
    pub fn delete(&self) -> Result<()> {
        let name = self.name("delete")?;
        self.db.delete(&name).map(|_| ())
    }

    /// Open a session on the document.
    pub fn session<T>(&self) -> Result<Session<'a, T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let name = self.name("a session")?;
        self.db.session(&name)
    }

    /// Run `f` in a session on the document.
    pub fn with_session<T, R, E, F>(&self, f: F) -> std::result::Result<R, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<Error>,
        F: FnOnce(&mut Session<'a, T>) -> std::result::Result<R, E>,
    {
        let name = self.name("a session")?;
        let mut session = self.db.session::<T>(&name)?;
        let out = f(&mut session);
        drop(session);
        out
    }

    fn read_pattern(&self, pattern: &NamePattern) -> Result<Value> {
        let entries = self.db.multiread(pattern)?;
        Ok(Value::Object(entries.into_iter().collect::<Map<String, Value>>()))
    }
}
