pub mod done;
pub mod list;
pub mod status;
pub mod sync;
pub mod watch;

use anyhow::{Context, Result};
use chrono::Local;
use deadline_core::storage::FileStorage;
use deadline_core::{Deadline, SyncDriver, SyncOptions};
use deadline_provider_google::{Auth, GoogleCalendar, Session};

use crate::config::{self, Config};

pub fn open_storage(config: &Config) -> Result<FileStorage> {
    let dir = config.data_dir();
    FileStorage::open(&dir).with_context(|| format!("Failed to open data directory {}", dir.display()))
}

/// Open deadlines up to `days` ahead, or the configured horizon.
pub fn open_deadlines(
    config: &Config,
    storage: &FileStorage,
    days: Option<i64>,
) -> Result<Vec<Deadline>> {
    let now = Local::now().naive_local();
    storage
        .list_open_deadlines(config.horizon(now, days), now)
        .with_context(|| format!("Failed to read {}", storage.source_info().display()))
}

pub fn create_driver(config: &Config, storage: &FileStorage) -> Result<SyncDriver<GoogleCalendar>> {
    let session = Session::new(config::tokens_path()?, config.google_credentials()?);
    let google = GoogleCalendar::new(Auth::Session(session))?;
    let options = SyncOptions::new(&config.calendar_prefix).with_pacing(config.pacing());

    Ok(SyncDriver::new(google, storage.state_store(), options)?)
}
