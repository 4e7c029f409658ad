//! Database names and wildcard patterns
//!
//! A database name is a `/`-separated path of segments, e.g. `users/42`.
//! A name with a `*` in exactly one segment is a [`NamePattern`] and may only
//! be used for multi-target reads.

use crate::error::{Error, Result};
use std::fmt;
use std::path::PathBuf;

/// Wildcard character inside a segment.
pub const WILDCARD: char = '*';

/// Longest accepted segment, in bytes.
///
/// Leaves room below the usual 255-byte file name limit for the extension
/// and the temporary-file decoration added while writing.
pub const MAX_SEGMENT_LEN: usize = 200;

/// A validated, concrete database name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DbName(String);

impl DbName {
    /// Parse and validate a concrete name.
    ///
    /// Fails with [`Error::InvalidQuery`] if the name contains a wildcard.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_segments(&name)?;
        if name.contains(WILDCARD) {
            return Err(Error::invalid_query(format!(
                "wildcard name \"{}\" can only be used for reading",
                name
            )));
        }
        Ok(DbName(name))
    }

    /// The name as given.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the `/`-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Relative path of the name below the storage root, without extension.
    pub fn relative_path(&self) -> PathBuf {
        self.segments().collect()
    }

    /// Flat, dot-free encoding used for lock record file names.
    ///
    /// `%`, `.`, `/` and `~` are percent-encoded so that nested names map to
    /// a single file name and the record fields can be split on `.`.
    pub fn escaped(&self) -> String {
        let mut out = String::with_capacity(self.0.len() + 8);
        for c in self.0.chars() {
            match c {
                '%' => out.push_str("%25"),
                '.' => out.push_str("%2E"),
                '/' => out.push_str("%2F"),
                '~' => out.push_str("%7E"),
                c => out.push(c),
            }
        }
        out
    }
}

impl fmt::Display for DbName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DbName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A name with exactly one wildcard segment, e.g. `users/*` or `logs/2024-*/summary`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    raw: String,
    prefix: Vec<String>,
    wildcard: String,
    suffix: Vec<String>,
}

impl NamePattern {
    /// Parse and validate a pattern.
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let raw = pattern.into();
        validate_segments(&raw)?;

        let segments: Vec<&str> = raw.split('/').collect();
        let wild: Vec<usize> = segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.contains(WILDCARD))
            .map(|(i, _)| i)
            .collect();

        let idx = match wild.as_slice() {
            [idx] => *idx,
            [] => {
                return Err(Error::invalid_query(format!(
                    "\"{}\" has no wildcard segment",
                    raw
                )))
            }
            _ => {
                return Err(Error::invalid_query(format!(
                    "\"{}\" has more than one wildcard segment",
                    raw
                )))
            }
        };

        Ok(NamePattern {
            prefix: segments[..idx].iter().map(|s| s.to_string()).collect(),
            wildcard: segments[idx].to_string(),
            suffix: segments[idx + 1..].iter().map(|s| s.to_string()).collect(),
            raw,
        })
    }

    /// The pattern as given.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Literal segments before the wildcard segment.
    pub fn prefix(&self) -> &[String] {
        &self.prefix
    }

    /// The wildcard segment itself.
    pub fn wildcard_segment(&self) -> &str {
        &self.wildcard
    }

    /// Literal segments after the wildcard segment.
    pub fn suffix(&self) -> &[String] {
        &self.suffix
    }

    /// Check whether a single path segment matches the wildcard segment.
    pub fn matches_segment(&self, candidate: &str) -> bool {
        glob_match(&self.wildcard, candidate)
    }

    /// Build the concrete name obtained by substituting `segment` for the
    /// wildcard segment.
    pub fn substitute(&self, segment: &str) -> Result<DbName> {
        let mut parts: Vec<&str> = self.prefix.iter().map(String::as_str).collect();
        parts.push(segment);
        parts.extend(self.suffix.iter().map(String::as_str));
        DbName::new(parts.join("/"))
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// What a caller selected: one database, or a wildcard set of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A concrete name
    Name(DbName),
    /// A wildcard pattern
    Pattern(NamePattern),
}

impl Target {
    /// Parse a selection string.
    pub fn parse(selector: &str) -> Result<Self> {
        if selector.contains(WILDCARD) {
            NamePattern::new(selector).map(Target::Pattern)
        } else {
            DbName::new(selector).map(Target::Name)
        }
    }

    /// True for a wildcard selection.
    pub fn is_pattern(&self) -> bool {
        matches!(self, Target::Pattern(_))
    }

    /// The raw selection string.
    pub fn as_str(&self) -> &str {
        match self {
            Target::Name(n) => n.as_str(),
            Target::Pattern(p) => p.as_str(),
        }
    }
}

fn invalid(name: &str, reason: &str) -> Error {
    Error::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_segments(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid(name, "name is empty"));
    }
    if name.contains('\\') || name.contains('\0') {
        return Err(invalid(name, "backslash and NUL are not allowed"));
    }
    if name.starts_with('/') {
        return Err(invalid(name, "name must be relative to the storage root"));
    }
    for segment in name.split('/') {
        match segment {
            "" => return Err(invalid(name, "empty segment")),
            "." | ".." => return Err(invalid(name, "relative segments are not allowed")),
            s if s.starts_with('.') => {
                return Err(invalid(name, "segments starting with '.' are reserved"))
            }
            s if s.len() > MAX_SEGMENT_LEN => {
                return Err(invalid(name, "segment is longer than 200 bytes"))
            }
            _ => {}
        }
    }
    Ok(())
}

/// Match `candidate` against a pattern where `*` matches any run of
/// characters (including none).
pub fn glob_match(pattern: &str, candidate: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let c: Vec<char> = candidate.chars().collect();
    let (mut pi, mut ci) = (0, 0);
    let mut star: Option<usize> = None;
    let mut resume = 0;

    while ci < c.len() {
        if pi < p.len() && p[pi] == WILDCARD {
            star = Some(pi);
            resume = ci;
            pi += 1;
        } else if pi < p.len() && p[pi] == c[ci] {
            pi += 1;
            ci += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            resume += 1;
            ci = resume;
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&ch| ch == WILDCARD)
}
