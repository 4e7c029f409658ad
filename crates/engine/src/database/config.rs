//! Store configuration via `dictdb.toml`
//!
//! Every knob has a default, so an empty file (or no file at all) is a valid
//! configuration. Durations are plain millisecond counts to keep the TOML
//! readable.

use dictdb_concurrency::LockConfig;
use dictdb_core::{Error, Result};
use dictdb_durability::{EncodeOptions, Variant};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file name conventionally placed next to the storage root.
pub const CONFIG_FILE_NAME: &str = "dictdb.toml";

/// Storage root used when none is configured.
pub const DEFAULT_STORAGE_ROOT: &str = "./ddb_storage";

/// Store configuration.
///
/// # Example
///
/// ```toml
/// storage_root = "/var/lib/myapp/ddb"
/// use_compression = true
/// lock_timeout_ms = 5000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding all databases.
    pub storage_root: PathBuf,
    /// Write `.ddb` (zlib) files instead of `.json`.
    pub use_compression: bool,
    /// Pretty-print uncompressed files.
    pub pretty_json: bool,
    /// Indent unit for pretty printing; spaces and tabs only.
    pub indent: String,
    /// Emit object keys in sorted order.
    pub sort_keys: bool,
    /// Fsync files before they become visible.
    pub fsync: bool,
    /// Maximum wait for a lock, in milliseconds.
    pub lock_timeout_ms: u64,
    /// Lock records untouched for this long are reclaimed, in milliseconds.
    pub stale_lock_ms: u64,
    /// Base lock polling interval, in milliseconds.
    pub lock_poll_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from(DEFAULT_STORAGE_ROOT),
            use_compression: false,
            pretty_json: true,
            indent: "\t".to_string(),
            sort_keys: true,
            fsync: true,
            lock_timeout_ms: 60_000,
            stale_lock_ms: 30_000,
            lock_poll_ms: 1,
        }
    }
}

impl StoreConfig {
    /// Default configuration rooted at `root`.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self::default().with_storage_root(root)
    }

    /// Set the storage root
    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = root.into();
        self
    }

    /// Enable or disable compressed writes
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.use_compression = enabled;
        self
    }

    /// Enable or disable pretty printing
    pub fn with_pretty_json(mut self, enabled: bool) -> Self {
        self.pretty_json = enabled;
        self
    }

    /// Set the indent unit
    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    /// Enable or disable key sorting
    pub fn with_sort_keys(mut self, enabled: bool) -> Self {
        self.sort_keys = enabled;
        self
    }

    /// Enable or disable fsync
    pub fn with_fsync(mut self, enabled: bool) -> Self {
        self.fsync = enabled;
        self
    }

    /// Set the lock wait timeout
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the stale lock threshold
    pub fn with_stale_lock_threshold(mut self, threshold: Duration) -> Self {
        self.stale_lock_ms = threshold.as_millis() as u64;
        self
    }

    /// Set the base polling interval
    pub fn with_lock_poll_interval(mut self, interval: Duration) -> Self {
        self.lock_poll_ms = interval.as_millis() as u64;
        self
    }

    /// Check the configuration for values the store cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.storage_root.as_os_str().is_empty() {
            return Err(Error::Config("storage_root must not be empty".to_string()));
        }
        if self.indent.chars().any(|c| c != ' ' && c != '\t') {
            return Err(Error::Config(format!(
                "indent {:?} must consist of spaces and tabs",
                self.indent
            )));
        }
        if self.stale_lock_ms == 0 {
            return Err(Error::Config(
                "stale_lock_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Variant new files are written as.
    pub fn variant(&self) -> Variant {
        Variant::for_compression(self.use_compression)
    }

    /// Encoding policy derived from this configuration.
    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions::default()
            .with_variant(self.variant())
            .with_pretty(self.pretty_json)
            .with_indent(self.indent.clone())
            .with_sort_keys(self.sort_keys)
    }

    /// Lock protocol timings derived from this configuration.
    pub fn lock_config(&self) -> LockConfig {
        LockConfig {
            timeout: Duration::from_millis(self.lock_timeout_ms),
            stale_after: Duration::from_millis(self.stale_lock_ms),
            poll_interval: Duration::from_millis(self.lock_poll_ms),
        }
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# dictdb store configuration

# Directory holding all databases. Relative paths are resolved against the
# directory containing this file.
storage_root = "./ddb_storage"

# Write zlib-compressed .ddb files instead of .json (default: false).
# Existing files of either kind are always readable.
use_compression = false

# Pretty-print .json files (default: true) with this indent unit.
pretty_json = true
indent = "\t"

# Emit object keys in sorted order (default: true).
sort_keys = true

# Fsync every file before it replaces the previous version (default: true).
fsync = true

# Lock timings in milliseconds.
lock_timeout_ms = 60000
stale_lock_ms = 30000
lock_poll_ms = 1
"#
    }

    /// Read and parse config from a file path.
    ///
    /// A relative `storage_root` is resolved against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading config file {}", path.display()), e))?;
        let mut config: StoreConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        if config.storage_root.is_relative() {
            if let Some(dir) = path.parent() {
                config.storage_root = dir.join(&config.storage_root);
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content)
            .map_err(|e| Error::io(format!("writing config file {}", path.display()), e))
    }
}
