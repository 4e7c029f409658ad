//! Core types for dictdb
//!
//! This crate defines the foundational types used throughout the system:
//! - Error: the semantic error taxonomy every operation reports through
//! - DbName / NamePattern / Target: validated database names and wildcard patterns
//! - Value: the stored document tree (a re-export of `serde_json::Value`)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod name;

pub use error::{Error, Result};
pub use name::{glob_match, DbName, NamePattern, Target, MAX_SEGMENT_LEN, WILDCARD};

/// A stored document: any JSON value, not necessarily a mapping.
pub use serde_json::Value;

/// Object type of [`Value`], insertion-ordered.
pub use serde_json::Map;
