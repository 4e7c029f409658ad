//! Wildcard multiread
//!
//! A pattern such as `users/*` or `groups/*/profile` is expanded by listing
//! the one directory level that holds the wildcard segment. Each match is
//! then read on its own with a normal read lock, so a multiread is *not* a
//! snapshot across names: every entry is individually consistent, and a
//! name deleted between listing and reading is simply left out.

use crate::database::{from_value, Database};
use dictdb_core::{DbName, Error, NamePattern, Result, Value};
use dictdb_durability::{Variant, TEMP_SUFFIX};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use tracing::trace;

impl Database {
    /// Concrete names currently matching `pattern`, in sorted order.
    pub fn expand(&self, pattern: &NamePattern) -> Result<Vec<DbName>> {
        let mut dir = self.root().to_path_buf();
        for segment in pattern.prefix() {
            dir.push(segment);
        }

        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(format!("listing {}", dir.display()), e)),
        };

        let leaf = pattern.suffix().is_empty();
        let mut segments = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(format!("listing {}", dir.display()), e))?;
            let Some(file_name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if file_name.starts_with('.') || file_name.ends_with(TEMP_SUFFIX) {
                continue;
            }
            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(_) => continue,
            };

            let segment = if leaf {
                if !file_type.is_file() {
                    continue;
                }
                match split_extension(&file_name) {
                    Some(stem) => stem.to_string(),
                    None => continue,
                }
            } else {
                if !file_type.is_dir() {
                    continue;
                }
                file_name
            };

            if pattern.matches_segment(&segment) {
                segments.insert(segment);
            }
        }

        let mut names = Vec::with_capacity(segments.len());
        for segment in segments {
            // Segments that do not form a valid name cannot have been
            // written by the store; skip them.
            let Ok(name) = pattern.substitute(&segment) else {
                continue;
            };
            if leaf || self.paths().resolve(&name).exists() {
                names.push(name);
            }
        }
        trace!(target: "dictdb::engine", pattern = %pattern, matches = names.len(), "expanded pattern");
        Ok(names)
    }

    /// Read every document matching `pattern`, keyed by concrete name.
    pub fn multiread(&self, pattern: &NamePattern) -> Result<BTreeMap<String, Value>> {
        let mut out = BTreeMap::new();
        for name in self.expand(pattern)? {
            if let Some(value) = self.read(&name)? {
                out.insert(name.as_str().to_string(), value);
            }
        }
        Ok(out)
    }

    /// Read every document matching `pattern` into `T`.
    pub fn multiread_as<T: DeserializeOwned>(
        &self,
        pattern: &NamePattern,
    ) -> Result<BTreeMap<String, T>> {
        let mut out = BTreeMap::new();
        for (key, value) in self.multiread(pattern)? {
            let name = DbName::new(key.as_str())?;
            out.insert(key, from_value(&name, value)?);
        }
        Ok(out)
    }
}

/// Stem of a stored document file, if `file_name` has a store extension.
fn split_extension(file_name: &str) -> Option<&str> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    Variant::from_extension(ext)?;
    if stem.is_empty() {
        None
    } else {
        Some(stem)
    }
}
