use std::time::Duration;

use anyhow::Result;
use deadline_core::storage::StorageSink;
use log::{error, info, warn};

use super::{create_driver, open_deadlines, open_storage};
use crate::config::Config;

/// Sync every `interval_minutes` until interrupted.
pub async fn run(config: &Config, interval_minutes: u64) -> Result<()> {
    let storage = open_storage(config)?;
    let driver = create_driver(config, &storage)?;
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_minutes.max(1) * 60));

    info!(
        "Watching {} every {interval_minutes} min, Ctrl-C to stop",
        storage.source_info().display()
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping");
                return Ok(());
            }
        }

        let open = match open_deadlines(config, &storage, None) {
            Ok(open) => open,
            Err(e) => {
                error!("{e:#}");
                continue;
            }
        };

        let Some(handle) = driver.request_sync(open, StorageSink::new(storage.clone())) else {
            continue;
        };
        tokio::spawn(async move {
            match handle.await {
                Ok(report) => {
                    if let Err(e) = report.result {
                        warn!("Sync pass failed: {e}");
                    }
                }
                Err(e) => error!("Sync task aborted: {e}"),
            }
        });
    }
}
