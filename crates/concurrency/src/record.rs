//! Lock records
//!
//! A lock record is an empty-ish marker file in the lock directory whose
//! *name* carries all protocol state:
//!
//! ```text
//! {key}.{holder}.{timestamp_ns}.{stage}.{mode}.lock
//!
//! users%2F1.4211-9f0c....1718031234123456789.need.write.lock
//! users%2F1.4211-77aa....1718031234123999999.has.read.lock
//! ```
//!
//! - `key` is the escaped database name, or `~` plus a name-based uuid when
//!   the escaped name is too long to fit in a file name
//! - `stage` is `need` while a request waits and `has` once it is granted
//! - `mode` is `read` or `write`
//! - `timestamp_ns` orders competing write requests (FIFO)
//!
//! The file's modification time is the liveness signal used for stale-lock
//! reclamation; waiters rewrite their `need` record to keep it fresh.

use dictdb_core::DbName;
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// File extension of lock records.
pub const RECORD_SUFFIX: &str = "lock";

/// Longest escaped name used verbatim as a record key.
pub const MAX_READABLE_KEY: usize = 96;

/// Record key for `name`.
///
/// Short names stay readable in the lock directory. Longer ones are
/// replaced by a v5 uuid of the name, which keeps every record file name
/// well under the 255-byte limit. Escaped names never contain `~`, so the
/// two forms cannot collide.
pub fn record_key(name: &DbName) -> String {
    let escaped = name.escaped();
    if escaped.len() <= MAX_READABLE_KEY {
        return escaped;
    }
    let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_str().as_bytes());
    format!("~{}", id.simple())
}

/// Whether a record is a pending request or a granted lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Waiting for the lock
    Need,
    /// Holding the lock
    Has,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Stage::Need => "need",
            Stage::Has => "has",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "need" => Some(Stage::Need),
            "has" => Some(Stage::Has),
            _ => None,
        }
    }
}

/// Shared or exclusive access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Shared
    Read,
    /// Exclusive
    Write,
}

impl Mode {
    fn as_str(self) -> &'static str {
        match self {
            Mode::Read => "read",
            Mode::Write => "write",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "read" => Some(Mode::Read),
            "write" => Some(Mode::Write),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed lock record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    /// Record key of the database name, see [`record_key`]
    pub name: String,
    /// Holder identity (`{pid}-{request id}`)
    pub holder: String,
    /// Request timestamp, nanoseconds since the Unix epoch
    pub timestamp_ns: i64,
    /// Need or has
    pub stage: Stage,
    /// Read or write
    pub mode: Mode,
}

impl LockRecord {
    /// File name encoding this record.
    pub fn file_name(&self) -> String {
        format!(
            "{}.{}.{}.{}.{}.{}",
            self.name,
            self.holder,
            self.timestamp_ns,
            self.stage.as_str(),
            self.mode.as_str(),
            RECORD_SUFFIX
        )
    }

    /// Parse a file name; `None` for anything that is not a lock record.
    pub fn parse(file_name: &str) -> Option<Self> {
        let parts: Vec<&str> = file_name.split('.').collect();
        let [name, holder, ts, stage, mode, suffix] = parts.as_slice() else {
            return None;
        };
        if *suffix != RECORD_SUFFIX || name.is_empty() || holder.is_empty() {
            return None;
        }
        Some(LockRecord {
            name: name.to_string(),
            holder: holder.to_string(),
            timestamp_ns: ts.parse().ok()?,
            stage: Stage::parse(stage)?,
            mode: Mode::parse(mode)?,
        })
    }

    /// True if this record belongs to the name with key `key`.
    pub fn is_for(&self, key: &str) -> bool {
        self.name == key
    }

    /// Queue position of a request: older first, holder id breaks ties.
    pub fn queue_cmp(&self, other: &LockRecord) -> Ordering {
        self.timestamp_ns
            .cmp(&other.timestamp_ns)
            .then_with(|| self.holder.cmp(&other.holder))
    }
}
