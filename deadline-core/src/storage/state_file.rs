use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use log::debug;

use crate::error::{DeadlineError, DeadlineResult};
use crate::sync::{SyncState, SyncStateStore};

/// [`SyncState`] as a JSON file.
///
/// Without a stored last-sync time, the modification time of `fallback` stands in
/// for it. That file is written whenever a pass surfaces remote entries, so its
/// age approximates the last pass that saw the remote side. It is a heuristic.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
    fallback: Option<PathBuf>,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>, fallback: Option<PathBuf>) -> Self {
        JsonStateStore {
            path: path.into(),
            fallback,
        }
    }

    fn fallback_time(&self) -> Option<DateTime<Utc>> {
        let modified = fs::metadata(self.fallback.as_ref()?).ok()?.modified().ok()?;
        Some(DateTime::<Utc>::from(modified))
    }
}

impl SyncStateStore for JsonStateStore {
    fn load(&self) -> DeadlineResult<SyncState> {
        let mut state = if self.path.exists() {
            let content = fs::read_to_string(&self.path).map_err(|e| {
                DeadlineError::Storage(format!("Failed to read {}: {e}", self.path.display()))
            })?;
            serde_json::from_str(&content)?
        } else {
            SyncState::default()
        };

        if state.last_successful_sync.is_none() {
            state.last_successful_sync = self.fallback_time();
            if let Some(time) = state.last_successful_sync {
                debug!("No stored sync time, using file date {time}");
            }
        }
        Ok(state)
    }

    fn save(&self, state: &SyncState) -> DeadlineResult<()> {
        let content = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, content).map_err(|e| {
            DeadlineError::Storage(format!("Failed to write {}: {e}", self.path.display()))
        })
    }
}
