//! Cross-process reader/writer lock manager
//!
//! Every participant (thread or process) coordinates through record files in
//! one shared lock directory. No participant trusts its own view of the
//! directory until it has published its claim, so the protocol is always
//! *create, then verify*:
//!
//! ```text
//! acquire(mode):
//!   1. create  need.{mode}                  (announce intent, join queue)
//!   2. scan    reclaim stale records, check whether we are blocked
//!   3. create  has.{mode}                   (claim)
//!   4. rescan  conflicting has.* present?  -> remove has, back off, goto 2
//!   5. remove  need.{mode}, return guard
//! ```
//!
//! Blocking rules:
//!
//! | request | blocked by                                              |
//! |---------|---------------------------------------------------------|
//! | read    | any other `has.write` or `need.write`                   |
//! | write   | any other `has.*`, or an older `need.write`             |
//!
//! Two conflicting claims can never both survive step 4: whichever
//! participant rescans last sees the other's `has` record. Pending writers
//! block new readers, so a steady stream of readers cannot starve a writer,
//! and writers are served oldest request first.
//!
//! A participant that dies leaves its records behind. Any record whose
//! modification time is older than [`LockConfig::stale_after`] is removed by
//! whoever scans next; waiters refresh their own `need` record so they are
//! never mistaken for dead.

use crate::guard::{describe_holder, LockGuard, RecordFile};
use crate::record::{record_key, LockRecord, Mode, Stage};
use dictdb_core::{DbName, Error, Result};
use rand::Rng;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, trace, warn};

/// Upper bound of the backoff between polls.
const MAX_BACKOFF: Duration = Duration::from_millis(20);

/// Timing knobs of the lock protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockConfig {
    /// Give up with [`Error::LockTimeout`] after waiting this long
    pub timeout: Duration,
    /// Records untouched for longer than this are presumed dead
    pub stale_after: Duration,
    /// Initial delay between polls
    pub poll_interval: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        LockConfig {
            timeout: Duration::from_secs(60),
            stale_after: Duration::from_secs(30),
            poll_interval: Duration::from_millis(1),
        }
    }
}

/// Grants read and write locks on database names.
///
/// Any number of `LockManager`s, in any number of processes, may point at
/// the same lock directory; they coordinate purely through its contents.
#[derive(Debug, Clone)]
pub struct LockManager {
    dir: PathBuf,
    config: LockConfig,
}

impl LockManager {
    /// Create a manager over `dir`. The directory is created lazily.
    pub fn new(dir: impl Into<PathBuf>, config: LockConfig) -> Self {
        LockManager {
            dir: dir.into(),
            config,
        }
    }

    /// Get the lock directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the timing configuration
    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Wait for a shared lock on `name`.
    pub fn acquire_read(&self, name: &DbName) -> Result<LockGuard> {
        self.acquire(name, Mode::Read)
    }

    /// Wait for an exclusive lock on `name`.
    pub fn acquire_write(&self, name: &DbName) -> Result<LockGuard> {
        self.acquire(name, Mode::Write)
    }

    /// Every record currently present for `name`, without reclaiming any.
    pub fn records(&self, name: &DbName) -> Result<Vec<LockRecord>> {
        let key = record_key(name);
        Ok(self
            .list()?
            .into_iter()
            .map(|(_, record)| record)
            .filter(|r| r.is_for(&key))
            .collect())
    }

    /// Granted locks currently recorded for `name`.
    pub fn holders(&self, name: &DbName) -> Result<Vec<LockRecord>> {
        Ok(self
            .records(name)?
            .into_iter()
            .filter(|r| r.stage == Stage::Has)
            .collect())
    }

    fn acquire(&self, name: &DbName, mode: Mode) -> Result<LockGuard> {
        let started = Instant::now();
        let need = LockRecord {
            name: record_key(name),
            holder: new_holder_id(),
            timestamp_ns: now_ns(),
            stage: Stage::Need,
            mode,
        };
        let mut need_file = self.create_record(&need)?;
        let mut last_refresh = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            let others = self.scan_others(&need)?;
            if !is_blocked(&need, &others) {
                let has = LockRecord {
                    stage: Stage::Has,
                    ..need.clone()
                };
                let has_file = self.create_record(&has)?;
                let others = self.scan_others(&need)?;
                if !has_conflict(&has, &others) {
                    need_file.remove()?;
                    debug!(
                        target: "dictdb::lock",
                        name = %name,
                        mode = %mode,
                        waited_us = started.elapsed().as_micros() as u64,
                        attempts = attempt + 1,
                        "lock acquired"
                    );
                    return Ok(LockGuard::new(has_file, name.to_string()));
                }
                trace!(target: "dictdb::lock", name = %name, mode = %mode, "claim collided, withdrawing");
                drop(has_file);
            }

            let waited = started.elapsed();
            if waited >= self.config.timeout {
                debug!(
                    target: "dictdb::lock",
                    name = %name,
                    mode = %mode,
                    waited_ms = waited.as_millis() as u64,
                    "lock wait timed out"
                );
                return Err(Error::LockTimeout {
                    name: name.to_string(),
                    waited,
                });
            }

            if last_refresh.elapsed() >= self.config.stale_after / 4 {
                if !need_file.touch()? {
                    // Our request was reclaimed; publish it again.
                    need_file.remove()?;
                    need_file = self.create_record(&need)?;
                }
                last_refresh = Instant::now();
            }

            std::thread::sleep(self.backoff(attempt));
            attempt = attempt.saturating_add(1);
        }
    }

    /// Jittered exponential backoff, never shorter than the poll interval.
    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.config.poll_interval.max(Duration::from_micros(50));
        let cap = MAX_BACKOFF.max(self.config.poll_interval);
        let delay = base.saturating_mul(1u32 << attempt.min(10)).min(cap);
        let jitter_us = delay.as_micros() as u64 / 2;
        let jitter = if jitter_us == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_us)
        };
        delay + Duration::from_micros(jitter)
    }

    /// Records for the same name held by other participants, with stale
    /// ones reclaimed.
    fn scan_others(&self, me: &LockRecord) -> Result<Vec<LockRecord>> {
        let now = SystemTime::now();
        let mut live = Vec::new();
        for (path, record) in self.list()? {
            if !record.is_for(&me.name) || record.holder == me.holder {
                continue;
            }
            if self.is_stale(&path, now) {
                self.reclaim(&path, &record);
                continue;
            }
            live.push(record);
        }
        Ok(live)
    }

    fn is_stale(&self, path: &Path, now: SystemTime) -> bool {
        let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(_) => return false,
        };
        now.duration_since(modified)
            .map(|age| age > self.config.stale_after)
            .unwrap_or(false)
    }

    fn reclaim(&self, path: &Path, record: &LockRecord) {
        match std::fs::remove_file(path) {
            Ok(()) => warn!(
                target: "dictdb::lock",
                holder = %record.holder,
                mode = %record.mode,
                stage = ?record.stage,
                path = %path.display(),
                "recovered stale lock"
            ),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                target: "dictdb::lock",
                path = %path.display(),
                error = %e,
                "failed to remove stale lock record"
            ),
        }
    }

    fn list(&self) -> Result<Vec<(PathBuf, LockRecord)>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(format!("listing {}", self.dir.display()), e)),
        };

        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(format!("listing {}", self.dir.display()), e))?;
            let file_name = entry.file_name();
            if let Some(record) = file_name.to_str().and_then(LockRecord::parse) {
                out.push((entry.path(), record));
            }
        }
        Ok(out)
    }

    fn create_record(&self, record: &LockRecord) -> Result<RecordFile> {
        let path = self.dir.join(record.file_name());
        let open = || OpenOptions::new().write(true).create_new(true).open(&path);
        let mut file = match open() {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                std::fs::create_dir_all(&self.dir)
                    .map_err(|e| Error::io(format!("creating {}", self.dir.display()), e))?;
                open().map_err(|e| Error::io(format!("creating {}", path.display()), e))?
            }
            Err(e) => return Err(Error::io(format!("creating {}", path.display()), e)),
        };
        let record_file = RecordFile::new(path, record.clone());
        file.write_all(describe_holder(record).as_bytes())
            .map_err(|e| Error::io(format!("writing {}", record_file.path().display()), e))?;
        Ok(record_file)
    }
}

fn is_blocked(me: &LockRecord, others: &[LockRecord]) -> bool {
    match me.mode {
        Mode::Read => others.iter().any(|r| r.mode == Mode::Write),
        Mode::Write => others.iter().any(|r| match r.stage {
            Stage::Has => true,
            Stage::Need => r.mode == Mode::Write && r.queue_cmp(me).is_lt(),
        }),
    }
}

fn has_conflict(me: &LockRecord, others: &[LockRecord]) -> bool {
    others.iter().any(|r| {
        r.stage == Stage::Has && (me.mode == Mode::Write || r.mode == Mode::Write)
    })
}

fn new_holder_id() -> String {
    format!("{}-{}", std::process::id(), uuid::Uuid::new_v4().simple())
}

fn now_ns() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}
