//! Convenience re-exports
//!
//! ```no_run
//! use dictdb::prelude::*;
//! ```

pub use crate::{DictDb, Error, Result, Selection, Session, StoreConfig, Value};
