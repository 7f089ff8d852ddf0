//! State that survives between sync passes.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DeadlineError, DeadlineResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Start time of the last pass that completed.
    pub last_successful_sync: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

/// Persistence for [`SyncState`].
pub trait SyncStateStore: Send + Sync {
    fn load(&self) -> DeadlineResult<SyncState>;
    fn save(&self, state: &SyncState) -> DeadlineResult<()>;
}

/// Keeps the state in memory only.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<SyncState>,
}

impl MemoryStateStore {
    pub fn new(state: SyncState) -> Self {
        MemoryStateStore {
            state: Mutex::new(state),
        }
    }
}

impl SyncStateStore for MemoryStateStore {
    fn load(&self) -> DeadlineResult<SyncState> {
        self.state
            .lock()
            .map(|state| *state)
            .map_err(|_| DeadlineError::Storage("sync state lock poisoned".into()))
    }

    fn save(&self, state: &SyncState) -> DeadlineResult<()> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| DeadlineError::Storage("sync state lock poisoned".into()))?;
        *guard = *state;
        Ok(())
    }
}
