//! Line-oriented deadline files in a data directory.
//!
//! - `termin.txt`: deadlines as authored
//! - `termin-done.txt`: append-only completion record
//! - `termin-google-added.txt`: entries that first appeared on the remote side
//! - `sync-state.json`: [`SyncState`](crate::sync::SyncState) between runs

pub mod line;
pub mod state_file;

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use log::info;

use crate::deadline::{Deadline, without_done};
use crate::error::{DeadlineError, DeadlineResult};
use crate::reconcile::SideEffectSink;

pub use line::{RuleHandling, format_line, format_remote_line, parse_line};
pub use state_file::JsonStateStore;

pub const DEADLINES_FILE: &str = "termin.txt";
pub const DONE_FILE: &str = "termin-done.txt";
pub const REMOTE_ADDED_FILE: &str = "termin-google-added.txt";
pub const SYNC_STATE_FILE: &str = "sync-state.json";

const HEADER_PREFIX: &str = "--";

#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir` as data directory, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> DeadlineResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            DeadlineError::Storage(format!("Failed to create {}: {e}", dir.display()))
        })?;
        Ok(FileStorage { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the authored deadlines file.
    pub fn source_info(&self) -> PathBuf {
        self.dir.join(DEADLINES_FILE)
    }

    /// Store for the persisted sync state, next to the deadline files.
    pub fn state_store(&self) -> JsonStateStore {
        JsonStateStore::new(
            self.dir.join(SYNC_STATE_FILE),
            Some(self.dir.join(REMOTE_ADDED_FILE)),
        )
    }

    /// Open deadlines due before `horizon`, ordered by due time.
    ///
    /// Authored and remote-added entries are expanded and merged; anything that
    /// appears in the completion record is left out.
    pub fn list_open_deadlines(
        &self,
        horizon: NaiveDateTime,
        now: NaiveDateTime,
    ) -> DeadlineResult<Vec<Deadline>> {
        let rules = RuleHandling::Expand { horizon };
        let mut open = self.read(DEADLINES_FILE, now, rules)?;
        open.extend(self.read(REMOTE_ADDED_FILE, now, rules)?);
        open.retain(|d| d.when < horizon);

        let done = self.read(DONE_FILE, now, RuleHandling::Literal)?;
        let mut open = without_done(open, &done);
        open.sort_by_key(|d| d.when);
        Ok(open)
    }

    /// Append every deadline marked done to the completion record.
    pub fn record_completions(&self, deadlines: &[Deadline]) -> DeadlineResult<usize> {
        let done: Vec<String> = deadlines
            .iter()
            .filter(|d| d.done)
            .map(format_line)
            .collect();
        for line in &done {
            info!("Confirmed: '{line}'");
        }
        self.append(DONE_FILE, &done)?;
        Ok(done.len())
    }

    /// Append deadlines discovered on the remote side.
    pub fn record_remote_entries(&self, deadlines: &[Deadline]) -> DeadlineResult<usize> {
        let lines: Vec<String> = deadlines.iter().map(format_remote_line).collect();
        for line in &lines {
            info!("Added from remote: '{line}'");
        }
        self.append(REMOTE_ADDED_FILE, &lines)?;
        Ok(lines.len())
    }

    fn read(
        &self,
        name: &str,
        now: NaiveDateTime,
        rules: RuleHandling,
    ) -> DeadlineResult<Vec<Deadline>> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).map_err(|e| {
            DeadlineError::Storage(format!("Failed to read {}: {e}", path.display()))
        })?;
        Ok(content
            .lines()
            .flat_map(|line| parse_line(line, now, rules))
            .collect())
    }

    /// Append a timestamp header and `lines`. Nothing is written for no lines.
    fn append(&self, name: &str, lines: &[String]) -> DeadlineResult<()> {
        if lines.is_empty() {
            return Ok(());
        }
        let path = self.dir.join(name);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{HEADER_PREFIX}{}", Local::now().to_rfc2822())?;
        for line in lines {
            writeln!(file, "{line}")?;
        }
        Ok(())
    }
}

/// Writes side effects straight into the storage files and remembers what it
/// wrote. A failed write fails the pass, see [`SideEffectSink`].
#[derive(Debug, Clone)]
pub struct StorageSink {
    storage: FileStorage,
    pub remote_only: Vec<Deadline>,
    pub completed: Vec<Deadline>,
}

impl StorageSink {
    pub fn new(storage: FileStorage) -> Self {
        StorageSink {
            storage,
            remote_only: Vec::new(),
            completed: Vec::new(),
        }
    }
}

impl SideEffectSink for StorageSink {
    fn on_remote_only_entry_found(&mut self, deadline: Deadline) -> DeadlineResult<()> {
        self.storage.record_remote_entries(std::slice::from_ref(&deadline))?;
        self.remote_only.push(deadline);
        Ok(())
    }

    fn on_deadline_completed_remotely(&mut self, deadline: Deadline) -> DeadlineResult<()> {
        self.storage.record_completions(std::slice::from_ref(&deadline))?;
        self.completed.push(deadline);
        Ok(())
    }
}
