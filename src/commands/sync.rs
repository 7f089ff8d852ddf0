use anyhow::Result;
use deadline_core::storage::StorageSink;
use owo_colors::OwoColorize;

use super::{create_driver, open_deadlines, open_storage};
use crate::config::Config;
use crate::render::{Render, pluralize};

/// Threshold for compact view (show counts instead of individual changes)
const COMPACT_THRESHOLD: usize = 10;

pub async fn run(config: &Config) -> Result<()> {
    let storage = open_storage(config)?;
    let driver = create_driver(config, &storage)?;
    let open = open_deadlines(config, &storage, None)?;

    let mut sink = StorageSink::new(storage.clone());
    if !driver.run_once(&open, &mut sink).await? {
        println!("{}", "Sync skipped, see log for details".yellow());
        return Ok(());
    }

    if let Some(plan) = driver.last_plan().await {
        if plan.mutations.len() <= COMPACT_THRESHOLD {
            for mutation in &plan.mutations {
                println!("   {}", mutation.render());
            }
        }
        let (inserted, deleted) = plan.counts();
        println!(
            "{} added, {} deleted, {} unchanged",
            inserted.green(),
            deleted.red(),
            plan.kept
        );
    }

    for deadline in &sink.remote_only {
        println!("{} {}", "new from calendar:".cyan(), deadline);
    }
    if !sink.completed.is_empty() {
        let n = sink.completed.len();
        println!("{} {} marked done in the calendar", n, pluralize("deadline", n));
    }

    Ok(())
}
