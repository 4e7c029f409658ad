//! Concurrency layer for dictdb
//!
//! Multiple-reader / single-writer locks per database name, shared between
//! threads and processes through record files in the storage root's lock
//! directory:
//!
//! - [`LockManager`]: the acquire protocol, stale-lock reclamation, timeouts
//! - [`LockGuard`]: a granted lock, released on drop
//! - [`LockRecord`]: the on-disk record format

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod guard;
pub mod manager;
pub mod record;

pub use guard::LockGuard;
pub use manager::{LockConfig, LockManager};
pub use record::{record_key, LockRecord, Mode, Stage};
