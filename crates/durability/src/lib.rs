//! Durability layer for dictdb
//!
//! This crate handles everything that touches document files:
//!
//! - Storage codec abstraction (identity for `.json`, zlib for `.ddb`)
//! - Document encoding with pretty-print / sort-keys policy
//! - Storage root layout and variant resolution
//! - Atomic file replacement (temp + fsync + rename)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod document;
pub mod file;
mod finite;
pub mod paths;

pub use codec::{CodecError, DeflateCodec, IdentityCodec, StorageCodec, Variant};
pub use document::{decode_document, decode_key, encode_document, sort_keys, to_value, EncodeOptions};
pub use file::{read_file, remove_if_exists, StagedFile, TEMP_SUFFIX};
pub use paths::{Resolved, StoragePaths, LOCK_DIR_NAME};
