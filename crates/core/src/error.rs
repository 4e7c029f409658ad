//! Error types for dictdb
//!
//! Every failure surfaced by the store is one of the semantic kinds below.
//! Raw filesystem errors never escape unwrapped: they are carried inside
//! [`Error::Io`] together with the operation and path that failed.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for dictdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for dictdb
#[derive(Debug, Error)]
pub enum Error {
    /// Both the `.json` and the `.ddb` variant exist for one name.
    ///
    /// Never repaired automatically: a human has to decide which file is
    /// authoritative.
    #[error(
        "storage inconsistency: \"{name}\" exists as both {json:?} and {ddb:?}; \
         remove the stale file or delete the name"
    )]
    StorageInconsistency {
        /// Database name
        name: String,
        /// Uncompressed variant path
        json: PathBuf,
        /// Compressed variant path
        ddb: PathBuf,
    },

    /// `create` without overwrite on a name that already has a file
    #[error("database \"{name}\" already exists")]
    AlreadyExists {
        /// Database name
        name: String,
    },

    /// Value cannot be represented as a JSON document
    #[error("unsupported type: {reason}")]
    UnsupportedType {
        /// What the serializer rejected
        reason: String,
    },

    /// Stored bytes do not decompress or do not parse
    #[error("corrupt data in \"{name}\": {reason}")]
    CorruptData {
        /// Database name
        name: String,
        /// Decoder message
        reason: String,
    },

    /// A read or write guard could not be acquired in time
    #[error("timed out after {waited:?} waiting for lock on \"{name}\"")]
    LockTimeout {
        /// Database name
        name: String,
        /// How long the caller waited
        waited: Duration,
    },

    /// A held lock was reclaimed as stale by another participant
    #[error("lock on \"{name}\" was reclaimed while held")]
    LockLost {
        /// Database name
        name: String,
    },

    /// A session was opened twice for the same name by the same caller
    #[error("a session for \"{name}\" is already open in this thread")]
    ReentrantSession {
        /// Database name
        name: String,
    },

    /// Invalid combination of selection and request (wildcard + sub-key,
    /// wildcard + write, ...)
    #[error("invalid query: {reason}")]
    InvalidQuery {
        /// Why the query was rejected
        reason: String,
    },

    /// Malformed database name
    #[error("invalid database name {name:?}: {reason}")]
    InvalidName {
        /// The rejected name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Stored document does not fit the requested Rust type
    #[error("document \"{name}\" does not match the requested type: {reason}")]
    TypeMismatch {
        /// Database name
        name: String,
        /// Deserializer message
        reason: String,
    },

    /// Filesystem failure
    #[error("I/O error while {context}: {source}")]
    Io {
        /// Operation and path that failed
        context: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wrap an I/O error with the operation that produced it.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    /// Shorthand for [`Error::InvalidQuery`].
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        Error::InvalidQuery {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Error::UnsupportedType`].
    pub fn unsupported(reason: impl std::fmt::Display) -> Self {
        Error::UnsupportedType {
            reason: reason.to_string(),
        }
    }

    /// Check if this error may succeed on retry.
    ///
    /// Only lock timeouts qualify; every other kind is deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::LockTimeout { .. })
    }

    /// Check if this is a storage inconsistency.
    pub fn is_inconsistency(&self) -> bool {
        matches!(self, Error::StorageInconsistency { .. })
    }
}
