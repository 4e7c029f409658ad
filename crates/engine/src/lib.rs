//! Storage engine for dictdb
//!
//! This crate composes the lower layers into the public operations:
//! - [`Database`]: exists / read / create / write / delete under file locks
//! - Wildcard expansion and multiread (`Database::multiread`)
//! - [`Session`]: scoped read-modify-write with the write lock held
//! - [`StoreConfig`]: `dictdb.toml` backed configuration
//!
//! The engine is the only component that knows about:
//! - Lock ordering (encode before locking, release before returning)
//! - Variant switching when compression is toggled
//! - The per-thread session registry

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod database;
pub mod session;
pub mod wildcard;

pub use database::{Database, StoreConfig, CONFIG_FILE_NAME, DEFAULT_STORAGE_ROOT};
pub use session::Session;
