use anyhow::{Context, Result};
use chrono::Local;
use deadline_core::sync::SyncStateStore;
use owo_colors::OwoColorize;

use super::{open_deadlines, open_storage};
use crate::config::{self, Config};
use crate::render::Render;

pub fn run(config: &Config) -> Result<()> {
    let storage = open_storage(config)?;
    let state = storage
        .state_store()
        .load()
        .context("Failed to read sync state")?;
    let open = open_deadlines(config, &storage, None)?;
    let today = Local::now().date_naive();
    let overdue = open.iter().filter(|d| d.is_overdue(today)).count();

    println!("Deadlines: {}", storage.source_info().display());
    println!("Open: {} ({} overdue)", open.len(), overdue);
    println!("Calendar: {}*", config.calendar_prefix);

    let tokens = config::tokens_path()?;
    if tokens.exists() {
        println!("Google tokens: {}", tokens.display());
    } else {
        println!("Google tokens: {}", "missing".yellow());
    }

    println!("{}", state.render());
    Ok(())
}
